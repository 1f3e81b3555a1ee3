// Repository descriptors, per-pass records, status enumeration

use crate::constants::{GIT_DIR, GITMODULES_FILE};
use std::path::{Path, PathBuf};

/// A remote repository as listed by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub name: String,
    /// Owning user or organization.
    pub owner: String,
}

impl RepositoryDescriptor {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }
}

/// Classification outcome of one repository. Exactly one per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoStatus {
    NotPresent,
    Synchronized,
    OutOfDate,
    Obsolete,
    Modified,
    Conflict,
    Desynchronized,
}

impl RepoStatus {
    pub const ALL: [RepoStatus; 7] = [
        RepoStatus::NotPresent,
        RepoStatus::Synchronized,
        RepoStatus::OutOfDate,
        RepoStatus::Obsolete,
        RepoStatus::Modified,
        RepoStatus::Conflict,
        RepoStatus::Desynchronized,
    ];
}

/// Snapshot of one repository, rebuilt on every classification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    pub name: String,
    pub status: RepoStatus,
    pub branch: String,
    pub local_path: PathBuf,
    pub remote_url: String,
    pub has_submodules: bool,
}

/// Where repositories live locally and how their remotes are addressed.
#[derive(Debug, Clone)]
pub struct SyncLayout {
    /// Directory holding one clone per repository name.
    pub root: PathBuf,
    /// SSH host alias used in remote URLs.
    pub alias: String,
}

impl SyncLayout {
    pub fn new(root: impl Into<PathBuf>, alias: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            alias: alias.into(),
        }
    }

    /// `git@<alias>:<owner>/<name>.git`
    #[must_use]
    pub fn remote_url(&self, repo: &RepositoryDescriptor) -> String {
        format!("git@{}:{}/{}.git", self.alias, repo.owner, repo.name)
    }

    /// `<root>/<name>`
    #[must_use]
    pub fn local_path(&self, repo: &RepositoryDescriptor) -> PathBuf {
        self.root.join(&repo.name)
    }
}

/// A `.git` directory is the only signal that a clone exists.
pub fn is_git_repo(path: &Path) -> bool {
    path.join(GIT_DIR).is_dir()
}

pub fn has_submodules(path: &Path) -> bool {
    path.join(GITMODULES_FILE).is_file()
}
