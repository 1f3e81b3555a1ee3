//! Application-wide constants.
//!
//! Centralized configuration values to avoid magic numbers throughout the codebase.

use std::time::Duration;

/// Default timeout for individual git operations (in seconds).
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 40;

/// Default number of workers used within a single phase.
const DEFAULT_JOBS: usize = 4;

/// Upper bound on workers, to stay within remote-host connection limits.
pub const MAX_JOBS: usize = 8;

/// Returns the git command timeout.
///
/// Can be customized via the GIT_HAUL_TIMEOUT environment variable (in seconds).
/// Falls back to 40 seconds if not set or invalid.
///
/// Example: `GIT_HAUL_TIMEOUT=90 git-haul alice@github ~/src`
pub fn git_timeout() -> Duration {
    std::env::var("GIT_HAUL_TIMEOUT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
}

/// Returns the number of workers per phase.
///
/// Can be customized via the GIT_HAUL_JOBS environment variable.
pub fn default_jobs() -> usize {
    std::env::var("GIT_HAUL_JOBS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_JOBS)
}

/// Timeout for the `ssh -T` identity check.
pub const SSH_CHECK_TIMEOUT: Duration = Duration::from_secs(12);

/// Timeout for a single hosted API request.
pub const API_TIMEOUT: Duration = Duration::from_secs(20);

/// Page size requested from the hosted API (its maximum).
pub const API_PAGE_SIZE: usize = 100;

/// How often a running subprocess is polled for exit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Exit code reported when a command could not be spawned or timed out.
pub const EXEC_FAILURE_CODE: i32 = 99;

/// Upstream commits at least this old mark a repository obsolete.
pub const OBSOLETE_AFTER_DAYS: i64 = 30;

/// Progress bar tick interval in milliseconds.
pub const PROGRESS_TICK_MS: u64 = 80;

/// Git directory name used to detect repositories.
pub const GIT_DIR: &str = ".git";

/// Submodule configuration file.
pub const GITMODULES_FILE: &str = ".gitmodules";

/// Branch shown when there is no local clone or the branch could not be read.
pub const NO_BRANCH: &str = "-";

/// Exit status used when the operator interrupts the run.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;
