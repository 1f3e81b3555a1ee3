//! Best-effort submodule initialization after a clone, pull or fetch.

use crate::git::Git;
use crate::output::Reporter;
use crate::repo;
use std::fmt;
use std::path::Path;

/// What the updater did for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmoduleOutcome {
    /// No `.gitmodules`; nothing ran.
    Absent,
    Updated,
    InitFailed(String),
    UpdateFailed(String),
}

impl fmt::Display for SubmoduleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "no submodules"),
            Self::Updated => write!(f, "submodules updated"),
            Self::InitFailed(_) => write!(f, "submodule init failed"),
            Self::UpdateFailed(_) => write!(f, "submodule update failed"),
        }
    }
}

/// Runs `submodule init` then `submodule update --recursive` when the
/// repository declares submodules. Failures are reported as warnings only.
pub fn update(git: &Git<'_>, reporter: &Reporter, name: &str, path: &Path) -> SubmoduleOutcome {
    if !repo::has_submodules(path) {
        return SubmoduleOutcome::Absent;
    }

    if let Err(e) = git.submodule_init(path) {
        reporter.warn(format!("Warning: git submodule init failed in {name}: {}", e.stderr));
        return SubmoduleOutcome::InitFailed(e.stderr);
    }
    if let Err(e) = git.submodule_update(path) {
        reporter.warn(format!("Warning: git submodule update failed in {name}: {}", e.stderr));
        return SubmoduleOutcome::UpdateFailed(e.stderr);
    }

    reporter.success(format!("Submodules updated in {name}"));
    SubmoduleOutcome::Updated
}
