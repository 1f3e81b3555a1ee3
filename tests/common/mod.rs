//! Test infrastructure for git-haul integration tests.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{Duration, Utc};
use git_haul::classify::{self, Classification};
use git_haul::config::{Config, Verbosity};
use git_haul::git::{Git, run_git};
use git_haul::output::OutputSink;
use git_haul::runner::SystemRunner;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub const REPO_NAME: &str = "widget";

pub fn test_config() -> Config {
    Config {
        verbosity: Verbosity::Quiet,
        jobs: 2,
        ..Config::default()
    }
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Classifies `path` with real git against the current time.
pub fn classify_path(path: &Path) -> Classification {
    let config = test_config();
    let sink = OutputSink::in_memory();
    let git = Git::new(&SystemRunner, &config, sink.reporter());
    classify::classify(&git, path, Utc::now())
}

/// A bare "hosted" repository plus the places a test works with it.
///
/// ```text
/// <tmp>/remote.git   bare remote, seeded with one commit on master
/// <tmp>/upstream     another contributor's clone, used to push new commits
/// <tmp>/root         the local root; clones land in <tmp>/root/widget
/// ```
///
/// Everything is removed when dropped.
pub struct Hosted {
    temp_dir: TempDir,
    remote: PathBuf,
    upstream: PathBuf,
    root: PathBuf,
}

impl Hosted {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let base = temp_dir.path().to_path_buf();
        let config = test_config();
        let remote = base.join("remote.git");
        let upstream = base.join("upstream");
        let root = base.join("root");
        std::fs::create_dir(&remote)?;
        std::fs::create_dir(&upstream)?;
        std::fs::create_dir(&root)?;

        run_git(&remote, &config, &["init", "--bare", "-b", "master"])?;

        run_git(&upstream, &config, &["init", "-b", "master"])?;
        configure_identity(&upstream)?;
        std::fs::write(upstream.join("README.md"), "# Widget\n")?;
        run_git(&upstream, &config, &["add", "README.md"])?;
        run_git(&upstream, &config, &["commit", "-m", "Initial commit"])?;
        run_git(&upstream, &config, &["remote", "add", "origin", path_str(&remote)])?;
        run_git(&upstream, &config, &["push", "-u", "origin", "master"])?;

        Ok(Self {
            temp_dir,
            remote,
            upstream,
            root,
        })
    }

    /// URL usable by `git clone` for the hosted repository.
    pub fn remote_url(&self) -> String {
        path_str(&self.remote).to_string()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the local clone lives (or would live).
    pub fn local_path(&self) -> PathBuf {
        self.root.join(REPO_NAME)
    }

    /// Clones the remote into the local root.
    pub fn clone_local(&self) -> Result<PathBuf> {
        let local = self.local_path();
        let url = self.remote_url();
        run_git(
            &self.root,
            &test_config(),
            &["clone", url.as_str(), path_str(&local)],
        )?;
        configure_identity(&local)?;
        Ok(local)
    }

    /// Pushes a new upstream commit touching `file`, committed now.
    pub fn push_upstream(&self, file: &str, contents: &str) -> Result<()> {
        self.push_upstream_aged(file, contents, 0)
    }

    /// Pushes a new upstream commit whose committer date is `days_ago` days in the past.
    pub fn push_upstream_aged(&self, file: &str, contents: &str, days_ago: i64) -> Result<()> {
        std::fs::write(self.upstream.join(file), contents)?;
        run_git(&self.upstream, &test_config(), &["add", file])?;
        commit_dated(&self.upstream, &format!("Update {file}"), days_ago)?;
        run_git(&self.upstream, &test_config(), &["push", "origin", "master"])?;
        Ok(())
    }
}

/// Commits a new file in `repo` without pushing.
pub fn commit_local(repo: &Path, file: &str, contents: &str) -> Result<()> {
    std::fs::write(repo.join(file), contents)?;
    run_git(repo, &test_config(), &["add", file])?;
    let message = format!("Local {file}");
    run_git(repo, &test_config(), &["commit", "-m", message.as_str()])?;
    Ok(())
}

/// Leaves an untracked file in the working tree.
pub fn make_dirty(repo: &Path) -> Result<()> {
    std::fs::write(repo.join("scratch.txt"), "work in progress\n")?;
    Ok(())
}

fn configure_identity(repo: &Path) -> Result<()> {
    let config = test_config();
    run_git(repo, &config, &["config", "user.email", "test@example.com"])?;
    run_git(repo, &config, &["config", "user.name", "Test User"])?;
    Ok(())
}

fn commit_dated(repo: &Path, message: &str, days_ago: i64) -> Result<()> {
    let when = (Utc::now() - Duration::days(days_ago))
        .format("%Y-%m-%dT%H:%M:%S+00:00")
        .to_string();
    let output = Command::new("git")
        .args(["commit", "-m", message])
        .current_dir(repo)
        .env("GIT_AUTHOR_DATE", &when)
        .env("GIT_COMMITTER_DATE", &when)
        .output()?;
    if !output.status.success() {
        anyhow::bail!(
            "git commit failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}
