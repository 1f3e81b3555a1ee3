//! Run configuration: verbosity, command timeout, worker count, prompting.

use crate::constants::{self, MAX_JOBS};
use crate::git::{self, GitLogger};
use std::time::Duration;

/// Settings shared by every pass and phase of one run.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// How much operator output is written.
    pub verbosity: Verbosity,
    /// Upper bound on any single git subprocess.
    pub timeout: Duration,
    /// Workers used within one classification pass or action phase.
    pub jobs: usize,
    /// Answer every phase confirmation with yes.
    pub assume_yes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            timeout: constants::git_timeout(),
            jobs: constants::default_jobs(),
            assume_yes: false,
        }
    }
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Worker count actually used: clamped to `1..=MAX_JOBS`, and one in
    /// verbose mode so command traces stay grouped by repository.
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.is_verbose() {
            1
        } else {
            self.jobs.clamp(1, MAX_JOBS)
        }
    }

    /// Command tracer handed to every [`crate::git::Git`] built from this config.
    #[must_use]
    pub fn git_logger(&self) -> GitLogger {
        if self.is_verbose() {
            git::verbose_logger
        } else {
            git::no_op_logger
        }
    }
}

/// Operator output level (`-q` / default / `-v`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}
