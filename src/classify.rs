//! Repository state classification.
//!
//! [`classify`] is an ordered decision tree over git query results. Any
//! query that cannot be read collapses to [`RepoStatus::Conflict`], the one
//! status that blocks every mutating action, so the function never fails.

use crate::constants::{NO_BRANCH, OBSOLETE_AFTER_DAYS};
use crate::git::{Divergence, Git};
use crate::output;
use crate::repo::{self, RepoStatus, RepositoryDescriptor, RepositoryRecord, SyncLayout};
use crate::sync::SyncContext;
use chrono::{DateTime, FixedOffset, Utc};
use rayon::prelude::*;
use std::path::Path;

/// Result of classifying one local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: RepoStatus,
    pub branch: String,
    pub has_submodules: bool,
}

impl Classification {
    fn new(status: RepoStatus, branch: &str, path: &Path) -> Self {
        Self {
            status,
            branch: branch.to_string(),
            has_submodules: repo::has_submodules(path),
        }
    }
}

/// Classifies the repository at `path` relative to its upstream, as of `now`.
///
/// Only `remote update` touches the network, and it only moves
/// remote-tracking refs.
pub fn classify(git: &Git<'_>, path: &Path, now: DateTime<Utc>) -> Classification {
    if !repo::is_git_repo(path) {
        return Classification::new(RepoStatus::NotPresent, NO_BRANCH, path);
    }

    let Ok(dirty) = git.is_dirty(path) else {
        return Classification::new(RepoStatus::Conflict, NO_BRANCH, path);
    };
    let Ok(branch) = git.current_branch(path) else {
        return Classification::new(RepoStatus::Conflict, NO_BRANCH, path);
    };
    if git.refresh_remotes(path).is_err() {
        return Classification::new(RepoStatus::Conflict, &branch, path);
    }

    // No upstream reads as "not diverged".
    let divergence = git.divergence(path).unwrap_or_default();

    if git.has_unmerged_paths(path).unwrap_or(true) {
        return Classification::new(RepoStatus::Conflict, &branch, path);
    }

    let status = decide(dirty, divergence, || {
        git.newest_upstream_commit(path)
            .map_or(0, |commit| elapsed_days(commit, now))
    });
    Classification::new(status, &branch, path)
}

/// Cases 7 to 11 of the decision tree. `days_behind` is only consulted for a
/// clean tree that is behind.
fn decide<F>(dirty: bool, divergence: Divergence, days_behind: F) -> RepoStatus
where
    F: FnOnce() -> i64,
{
    if dirty && divergence.is_diverged() {
        RepoStatus::Desynchronized
    } else if dirty {
        RepoStatus::Modified
    } else if divergence.behind > 0 {
        recency_status(days_behind())
    } else if divergence.ahead > 0 {
        RepoStatus::Modified
    } else {
        RepoStatus::Synchronized
    }
}

/// Splits a behind repository by the age of its newest upstream commit.
#[must_use]
pub fn recency_status(days: i64) -> RepoStatus {
    if days >= OBSOLETE_AFTER_DAYS {
        RepoStatus::Obsolete
    } else {
        RepoStatus::OutOfDate
    }
}

/// Whole days from `commit` to `now`, both taken in UTC.
#[must_use]
pub fn elapsed_days(commit: DateTime<FixedOffset>, now: DateTime<Utc>) -> i64 {
    (now - commit.with_timezone(&Utc)).num_days()
}

/// Builds a fresh record for every descriptor, in input order.
///
/// Repositories are classified on the context's worker pool. Returns `None`
/// if the run was cancelled before every repository was dispatched.
pub fn classify_all(
    repos: &[RepositoryDescriptor],
    layout: &SyncLayout,
    ctx: &SyncContext<'_>,
) -> Option<Vec<RepositoryRecord>> {
    let now = Utc::now();
    let progress = output::create_classify_progress(repos.len(), ctx.config);

    let records = ctx.pool.install(|| {
        repos
            .par_iter()
            .map(|descriptor| {
                if ctx.cancel.is_cancelled() {
                    return None;
                }
                let local_path = layout.local_path(descriptor);
                progress.set_message(descriptor.name.clone());
                let classification = classify(&ctx.git(), &local_path, now);
                progress.inc(1);
                Some(RepositoryRecord {
                    name: descriptor.name.clone(),
                    status: classification.status,
                    branch: classification.branch,
                    remote_url: layout.remote_url(descriptor),
                    local_path,
                    has_submodules: classification.has_submodules,
                })
            })
            .collect::<Option<Vec<_>>>()
    });

    progress.finish_and_clear();
    records
}
