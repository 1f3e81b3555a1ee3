//! Grouped, non-destructive reconciliation of classified repositories.
//!
//! Records are grouped into three phases by status. Each phase is confirmed
//! once as a whole and then applied member by member on the worker pool:
//!
//! ```text
//! CatchUp  (out of date, obsolete)             fetch -> recheck -> pull --ff-only -> submodules
//! Acquire  (not present)                       clone -> submodules
//! Refresh  (modified, conflict, desynchronized) fetch -> submodules
//! ```
//!
//! Nothing here merges, resets or deletes. A failing repository is reported
//! and skipped; the phase carries on with the rest.

use crate::config::Config;
use crate::git::Git;
use crate::interrupt::CancelToken;
use crate::output::{self, Reporter};
use crate::repo::{RepoStatus, RepositoryRecord};
use crate::runner::CommandRunner;
use crate::submodule::{self, SubmoduleOutcome};
use anyhow::Context;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::io;
use std::time::{Duration, Instant};

/// Everything a classification pass or an action phase needs.
pub struct SyncContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub config: &'a Config,
    pub reporter: &'a Reporter,
    pub cancel: &'a CancelToken,
    pub pool: &'a ThreadPool,
}

impl<'a> SyncContext<'a> {
    #[must_use]
    pub fn git(&self) -> Git<'a> {
        Git::new(self.runner, self.config, self.reporter)
    }
}

/// Builds the bounded pool used within passes and phases.
pub fn worker_pool(config: &Config) -> anyhow::Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(config.effective_jobs())
        .thread_name(|i| format!("git-haul-{i}"))
        .build()
        .context("Failed to build worker pool")
}

/// A group of repositories that receive the same action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    CatchUp,
    Acquire,
    Refresh,
}

impl Phase {
    /// Phases run strictly in this order.
    pub const ORDER: [Phase; 3] = [Phase::CatchUp, Phase::Acquire, Phase::Refresh];

    /// The phase that acts on `status`, if any.
    #[must_use]
    pub fn for_status(status: RepoStatus) -> Option<Phase> {
        match status {
            RepoStatus::OutOfDate | RepoStatus::Obsolete => Some(Phase::CatchUp),
            RepoStatus::NotPresent => Some(Phase::Acquire),
            RepoStatus::Modified | RepoStatus::Conflict | RepoStatus::Desynchronized => {
                Some(Phase::Refresh)
            }
            RepoStatus::Synchronized => None,
        }
    }

    #[must_use]
    pub fn heading(self) -> &'static str {
        match self {
            Phase::CatchUp => "The following repositories are out of date or obsolete:",
            Phase::Acquire => "The following repositories are not present locally:",
            Phase::Refresh => "The following repositories have local changes/conflicts:",
        }
    }

    #[must_use]
    pub fn prompt(self) -> &'static str {
        match self {
            Phase::CatchUp => "Update (fetch & pull) ALL out-of-date repositories?",
            Phase::Acquire => "Clone ALL missing repositories?",
            Phase::Refresh => {
                "Fetch latest info for ALL modified/conflicted repositories? (never pulls, never overwrites)"
            }
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::CatchUp => write!(f, "catch-up"),
            Phase::Acquire => write!(f, "acquisition"),
            Phase::Refresh => write!(f, "refresh"),
        }
    }
}

/// The step a failed action stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStep {
    Fetching,
    Pulling,
    Cloning,
}

impl fmt::Display for ActionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStep::Fetching => write!(f, "fetch"),
            ActionStep::Pulling => write!(f, "pull"),
            ActionStep::Cloning => write!(f, "clone"),
        }
    }
}

/// Why a catch-up pull was not attempted after fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullSkip {
    LocalChanges,
    MergeConflicts,
    /// The post-fetch checks could not be read.
    UnknownState,
}

impl fmt::Display for PullSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullSkip::LocalChanges => write!(f, "local changes"),
            PullSkip::MergeConflicts => write!(f, "merge conflicts"),
            PullSkip::UnknownState => write!(f, "unreadable working tree state"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Pulled { submodules: SubmoduleOutcome },
    PullSkipped { reason: PullSkip, submodules: SubmoduleOutcome },
    Cloned { submodules: SubmoduleOutcome },
    Fetched { submodules: SubmoduleOutcome },
    Failed { step: ActionStep, error: String },
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (action, submodules) = match self {
            ActionOutcome::Failed { step, error } => {
                return write!(f, "{step} failed: {error}");
            }
            ActionOutcome::Pulled { submodules } => ("pulled".to_string(), submodules),
            ActionOutcome::PullSkipped { reason, submodules } => {
                (format!("fetched, pull skipped ({reason})"), submodules)
            }
            ActionOutcome::Cloned { submodules } => ("cloned".to_string(), submodules),
            ActionOutcome::Fetched { submodules } => ("fetched".to_string(), submodules),
        };
        match submodules {
            SubmoduleOutcome::Absent => write!(f, "{action}"),
            other => write!(f, "{action}, {other}"),
        }
    }
}

/// What happened to one repository during one phase.
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub name: String,
    pub phase: Phase,
    pub outcome: ActionOutcome,
    pub duration: Duration,
}

/// Asks the operator whether a whole phase should run.
pub trait Confirm {
    fn confirm(&self, phase: Phase, members: usize) -> bool;

    /// True when a person answers, so the phase listing must stay visible
    /// even in quiet mode.
    fn is_interactive(&self) -> bool {
        false
    }
}

impl<F> Confirm for F
where
    F: Fn(Phase) -> bool,
{
    fn confirm(&self, phase: Phase, _members: usize) -> bool {
        self(phase)
    }
}

/// Accepts every phase (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _phase: Phase, _members: usize) -> bool {
        true
    }
}

/// Interactive yes/no prompt, defaulting to yes.
///
/// The prompt reads the terminal in raw mode, so Ctrl-C arrives as an
/// interrupted read rather than a signal; it cancels the run. Anything else
/// that prevents an answer (no terminal, closed input) counts as no.
#[derive(Debug, Clone)]
pub struct PromptConfirm {
    cancel: CancelToken,
}

impl PromptConfirm {
    #[must_use]
    pub fn new(cancel: &CancelToken) -> Self {
        Self {
            cancel: cancel.clone(),
        }
    }

    fn answer(&self, reply: Result<bool, dialoguer::Error>) -> bool {
        match reply {
            Ok(accepted) => accepted,
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => {
                self.cancel.cancel();
                false
            }
            Err(_) => false,
        }
    }
}

impl Confirm for PromptConfirm {
    fn confirm(&self, phase: Phase, _members: usize) -> bool {
        self.answer(
            dialoguer::Confirm::new()
                .with_prompt(phase.prompt())
                .default(true)
                .interact(),
        )
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

/// Runs the three phases over a classification snapshot.
///
/// Returns one result per repository that was acted on. Declined phases,
/// synchronized repositories and work left undispatched after cancellation
/// produce no result.
pub fn reconcile(
    records: &[RepositoryRecord],
    ctx: &SyncContext<'_>,
    confirm: &dyn Confirm,
) -> Vec<ActionResult> {
    let mut results = Vec::new();

    for phase in Phase::ORDER {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let members: Vec<&RepositoryRecord> = records
            .iter()
            .filter(|r| Phase::for_status(r.status) == Some(phase))
            .collect();
        if members.is_empty() {
            continue;
        }

        let listing = output::format_phase_members(phase.heading(), &members);
        if confirm.is_interactive() {
            ctx.reporter.notice(listing);
        } else {
            ctx.reporter.info(listing);
        }
        ctx.reporter.flush();
        let accepted = confirm.confirm(phase, members.len());
        if ctx.cancel.is_cancelled() {
            break;
        }
        if !accepted {
            ctx.reporter
                .info(format!("Skipping {} phase ({} repositories)", phase, members.len()));
            continue;
        }

        let phase_results = run_phase(phase, &members, ctx);
        if phase_results.len() < members.len() {
            ctx.reporter.warn(format!(
                "Interrupted: {} repositories left untouched in {} phase",
                members.len() - phase_results.len(),
                phase
            ));
        }
        results.extend(phase_results);
        ctx.reporter.flush();
    }

    results
}

fn run_phase(
    phase: Phase,
    members: &[&RepositoryRecord],
    ctx: &SyncContext<'_>,
) -> Vec<ActionResult> {
    ctx.pool.install(|| {
        members
            .par_iter()
            .filter_map(|record| {
                if ctx.cancel.is_cancelled() {
                    return None;
                }
                let started = Instant::now();
                let git = ctx.git();
                let outcome = match phase {
                    Phase::CatchUp => catch_up(&git, ctx.reporter, record),
                    Phase::Acquire => acquire(&git, ctx.reporter, record),
                    Phase::Refresh => refresh(&git, ctx.reporter, record),
                };
                Some(ActionResult {
                    name: record.name.clone(),
                    phase,
                    outcome,
                    duration: started.elapsed(),
                })
            })
            .collect()
    })
}

/// Fetch, then fast-forward only if the tree is still clean and unconflicted.
fn catch_up(git: &Git<'_>, reporter: &Reporter, record: &RepositoryRecord) -> ActionOutcome {
    let name = &record.name;
    let path = &record.local_path;
    reporter.info(format!("Updating repository {name}..."));

    if let Err(e) = git.fetch(path) {
        reporter.error(format!("git fetch failed for {name}: {}", e.stderr));
        return ActionOutcome::Failed {
            step: ActionStep::Fetching,
            error: e.to_string(),
        };
    }

    let skip = match (git.is_dirty(path), git.has_unmerged_paths(path)) {
        (Ok(false), Ok(false)) => None,
        (_, Ok(true)) => Some(PullSkip::MergeConflicts),
        (Ok(true), _) => Some(PullSkip::LocalChanges),
        _ => Some(PullSkip::UnknownState),
    };
    if let Some(reason) = skip {
        reporter.warn(format!("Skipped pull in {name} due to {reason}"));
        let submodules = submodule::update(git, reporter, name, path);
        return ActionOutcome::PullSkipped { reason, submodules };
    }

    if let Err(e) = git.pull_ff_only(path) {
        reporter.error(format!("git pull failed for {name}: {}", e.stderr));
        return ActionOutcome::Failed {
            step: ActionStep::Pulling,
            error: e.to_string(),
        };
    }
    reporter.success(format!("Pulled latest changes for {name}"));

    ActionOutcome::Pulled {
        submodules: submodule::update(git, reporter, name, path),
    }
}

fn acquire(git: &Git<'_>, reporter: &Reporter, record: &RepositoryRecord) -> ActionOutcome {
    let name = &record.name;
    reporter.info(format!("Cloning repository {name}..."));

    if let Err(e) = git.clone(&record.remote_url, &record.local_path) {
        reporter.error(format!("git clone failed for {name}: {}", e.stderr));
        return ActionOutcome::Failed {
            step: ActionStep::Cloning,
            error: e.to_string(),
        };
    }

    let submodules = submodule::update(git, reporter, name, &record.local_path);
    reporter.success(format!("Cloned {name}"));
    ActionOutcome::Cloned { submodules }
}

/// Fetch only. Local work is never touched.
fn refresh(git: &Git<'_>, reporter: &Reporter, record: &RepositoryRecord) -> ActionOutcome {
    let name = &record.name;
    reporter.info(format!(
        "Fetching latest info for {name} ({})...",
        output::status_label(record.status)
    ));

    if let Err(e) = git.fetch(&record.local_path) {
        reporter.error(format!("git fetch failed for {name}: {}", e.stderr));
        return ActionOutcome::Failed {
            step: ActionStep::Fetching,
            error: e.to_string(),
        };
    }

    let submodules = submodule::update(git, reporter, name, &record.local_path);
    reporter.success(format!("Fetched for {name}"));
    ActionOutcome::Fetched { submodules }
}
