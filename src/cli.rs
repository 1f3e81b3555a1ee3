//! Command-line arguments and run preconditions.

use crate::config::{Config, Verbosity};
use crate::constants;
use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

const EXAMPLES: &str = "\
Examples:
  git-haul jdobbs@github-yoyodyne ~/src/yoyodyne
  git-haul Hard-Problems-Group-LLC:hpg-mheck@github-hpg ~/src/hpg
  git-haul --org Hard-Problems-Group-LLC hpg-mheck@github-hpg ~/src/hpg

An organization may be given as a prefix (org:user@alias) or with --org,
but if both are given they must match.";

/// Defensive multi-repo synchronizer for GitHub via SSH.
///
/// Classifies every repository of a user or organization against its local
/// clone, then offers one confirmation per group: pull what is behind, clone
/// what is missing, fetch what has local work. Never merges, resets or
/// deletes anything.
#[derive(Debug, Parser)]
#[command(name = "git-haul", version, after_help = EXAMPLES)]
pub struct Cli {
    /// GitHub organization to enumerate repositories for
    #[arg(long)]
    pub org: Option<String>,

    /// [<org>:]<github-user>@<github-host-ssh-alias>
    pub target: String,

    /// Local root directory holding one clone per repository
    pub local_root: PathBuf,

    /// Answer yes to every phase confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Only print warnings, errors and a one-line summary
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Trace every git command; processes one repository at a time
    #[arg(short, long)]
    pub verbose: bool,

    /// Repositories processed concurrently within a phase (1-8)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Timeout for a single git command, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not verify the SSH identity before starting
    #[arg(long)]
    pub skip_ssh_check: bool,
}

impl Cli {
    /// Runtime configuration; unset flags fall back to environment defaults.
    #[must_use]
    pub fn config(&self) -> Config {
        let verbosity = if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Config {
            verbosity,
            timeout: self
                .timeout
                .filter(|secs| *secs > 0)
                .map_or_else(constants::git_timeout, Duration::from_secs),
            jobs: self.jobs.unwrap_or_else(constants::default_jobs),
            assume_yes: self.yes,
        }
    }
}

/// Parsed `[<org>:]<user>@<alias>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub org: Option<String>,
    pub user: String,
    pub alias: String,
}

impl Target {
    pub fn parse(arg: &str) -> anyhow::Result<Self> {
        let Some((head, alias)) = arg.rsplit_once('@') else {
            anyhow::bail!("Target must be in the form <user>@<alias> or <org>:<user>@<alias>");
        };
        let (org, user) = match head.split_once(':') {
            Some((org, user)) => (Some(org), user),
            None => (None, head),
        };
        if user.is_empty() || alias.is_empty() {
            anyhow::bail!("Parsing failed: user or alias missing in '{arg}'");
        }
        Ok(Self {
            org: org.filter(|o| !o.is_empty()).map(str::to_string),
            user: user.to_string(),
            alias: alias.to_string(),
        })
    }

    /// Merges the prefix organization with `--org`; they must agree when both are set.
    pub fn resolve_org(&self, flag: Option<&str>) -> anyhow::Result<Option<String>> {
        match (self.org.as_deref(), flag) {
            (Some(prefix), Some(flag)) if prefix != flag => anyhow::bail!(
                "Organization mismatch: '{prefix}' (from target) != '{flag}' (from --org). Use only one, or ensure they match."
            ),
            (_, Some(flag)) => Ok(Some(flag.to_string())),
            (prefix, None) => Ok(prefix.map(str::to_string)),
        }
    }
}

/// Expands `~`, canonicalizes, and requires an existing writable directory.
pub fn resolve_root(path: &Path) -> anyhow::Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .context("Cannot expand '~': no home directory")?
            .join(rest),
        Err(_) => path.to_path_buf(),
    };
    if !expanded.exists() {
        anyhow::bail!("Local path '{}' does not exist", expanded.display());
    }
    let root = expanded
        .canonicalize()
        .with_context(|| format!("Failed to resolve local path '{}'", expanded.display()))?;
    let metadata = std::fs::metadata(&root)
        .with_context(|| format!("Failed to read local path '{}'", root.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("Local path '{}' is not a directory", root.display());
    }
    if metadata.permissions().readonly() {
        anyhow::bail!("Local path '{}' is not writable", root.display());
    }
    Ok(root)
}
