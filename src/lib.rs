//! Bulk, non-destructive synchronizer for a set of GitHub repositories.
//!
//! This crate reconciles local clones under one root directory with their
//! remotes by:
//! - Classifying each repository into one of seven states
//! - Grouping repositories by the action their state calls for
//! - Asking once per group, then fetching, fast-forwarding or cloning
//! - Initializing submodules where present
//!
//! It never merges, rebases, resets, or deletes.

pub mod classify;
pub mod cli;
pub mod config;
pub mod constants;
pub mod git;
pub mod github;
pub mod interrupt;
pub mod output;
pub mod repo;
pub mod runner;
pub mod ssh;
pub mod submodule;
pub mod sync;
