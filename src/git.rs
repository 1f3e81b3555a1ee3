//! Git command wrappers.
//!
//! This module provides a thin typed layer over the git CLI. Every call goes
//! through a [`CommandRunner`], so the layer itself never spawns processes
//! and can be driven by a scripted runner in tests.

use crate::config::Config;
use crate::output::Reporter;
use crate::runner::{CommandOutput, CommandRunner, SystemRunner};
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use std::time::Duration;

/// Callback invoked before every git command, used for verbose tracing.
pub type GitLogger = fn(&Reporter, Option<&Path>, &[&str]);

/// Logs the full git command line and the directory it runs in.
pub fn verbose_logger(reporter: &Reporter, cwd: Option<&Path>, args: &[&str]) {
    match cwd {
        Some(dir) => reporter.trace(format!("$ git {}  ({})", args.join(" "), dir.display())),
        None => reporter.trace(format!("$ git {}", args.join(" "))),
    }
}

pub fn no_op_logger(_reporter: &Reporter, _cwd: Option<&Path>, _args: &[&str]) {}

/// A git invocation that ran but did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("git {command} failed ({code}): {stderr}")]
pub struct GitFailure {
    pub command: String,
    pub code: i32,
    pub stderr: String,
}

/// Commit counts relative to the configured upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Divergence {
    /// Commits only reachable from upstream.
    pub behind: u32,
    /// Commits only reachable from local `HEAD`.
    pub ahead: u32,
}

impl Divergence {
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        self.behind > 0 || self.ahead > 0
    }

    /// Parses `rev-list --left-right --count @{u}...HEAD` output ("behind\tahead").
    #[must_use]
    pub fn parse(output: &str) -> Option<Self> {
        let mut counts = output.split_whitespace().map(str::parse::<u32>);
        match (counts.next(), counts.next(), counts.next()) {
            (Some(Ok(behind)), Some(Ok(ahead)), None) => Some(Self { behind, ahead }),
            _ => None,
        }
    }
}

/// Git operations against one runner, bound to the run's timeout and logger.
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    reporter: &'a Reporter,
    timeout: Duration,
    logger: GitLogger,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &Config, reporter: &'a Reporter) -> Self {
        Self {
            runner,
            reporter,
            timeout: config.timeout,
            logger: config.git_logger(),
        }
    }

    /// Runs `git <args>` and returns the raw result.
    pub fn run(&self, cwd: Option<&Path>, args: &[&str]) -> CommandOutput {
        (self.logger)(self.reporter, cwd, args);
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("git");
        argv.extend_from_slice(args);
        self.runner.run(&argv, cwd, self.timeout)
    }

    fn run_checked(&self, cwd: Option<&Path>, args: &[&str]) -> Result<String, GitFailure> {
        let output = self.run(cwd, args);
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(GitFailure {
                command: args.join(" "),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }

    /// True when the working tree has staged, unstaged, or untracked changes.
    pub fn is_dirty(&self, repo: &Path) -> Result<bool, GitFailure> {
        self.run_checked(Some(repo), &["status", "--porcelain"])
            .map(|out| !out.trim().is_empty())
    }

    pub fn current_branch(&self, repo: &Path) -> Result<String, GitFailure> {
        self.run_checked(Some(repo), &["rev-parse", "--abbrev-ref", "HEAD"])
            .map(|out| out.trim().to_string())
    }

    /// Refreshes remote-tracking refs for every configured remote.
    pub fn refresh_remotes(&self, repo: &Path) -> Result<(), GitFailure> {
        self.run_checked(Some(repo), &["remote", "update"]).map(drop)
    }

    /// Behind/ahead counts against `@{u}`. `None` when there is no upstream
    /// or the output cannot be read.
    pub fn divergence(&self, repo: &Path) -> Option<Divergence> {
        self.run_checked(
            Some(repo),
            &["rev-list", "--left-right", "--count", "@{u}...HEAD"],
        )
        .ok()
        .and_then(|out| Divergence::parse(&out))
    }

    pub fn has_unmerged_paths(&self, repo: &Path) -> Result<bool, GitFailure> {
        self.run_checked(Some(repo), &["ls-files", "--unmerged"])
            .map(|out| !out.trim().is_empty())
    }

    /// Committer date of the newest upstream commit not yet in `HEAD`.
    pub fn newest_upstream_commit(&self, repo: &Path) -> Option<DateTime<FixedOffset>> {
        let out = self
            .run_checked(
                Some(repo),
                &["log", "-1", "--pretty=format:%cI", "HEAD..@{u}"],
            )
            .ok()?;
        DateTime::parse_from_rfc3339(out.trim()).ok()
    }

    pub fn fetch(&self, repo: &Path) -> Result<(), GitFailure> {
        self.run_checked(Some(repo), &["fetch"]).map(drop)
    }

    pub fn pull_ff_only(&self, repo: &Path) -> Result<(), GitFailure> {
        self.run_checked(Some(repo), &["pull", "--ff-only"]).map(drop)
    }

    pub fn clone(&self, url: &str, dest: &Path) -> Result<(), GitFailure> {
        let dest = dest.to_string_lossy();
        self.run_checked(None, &["clone", url, &*dest]).map(drop)
    }

    pub fn submodule_init(&self, repo: &Path) -> Result<(), GitFailure> {
        self.run_checked(Some(repo), &["submodule", "init"]).map(drop)
    }

    pub fn submodule_update(&self, repo: &Path) -> Result<(), GitFailure> {
        self.run_checked(Some(repo), &["submodule", "update", "--recursive"])
            .map(drop)
    }
}

/// Runs a git command directly, failing on a non-zero exit.
///
/// Used for setup outside the sync core, where an error should simply
/// propagate.
pub fn run_git(repo: &Path, config: &Config, args: &[&str]) -> anyhow::Result<String> {
    let mut argv = vec!["git"];
    argv.extend_from_slice(args);
    let output = SystemRunner.run(&argv, Some(repo), config.timeout);
    if output.success() {
        Ok(output.stdout)
    } else {
        anyhow::bail!("git {} failed: {}", args.join(" "), output.stderr)
    }
}
