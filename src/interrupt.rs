//! Operator interrupt handling.

use anyhow::Context;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag set once the operator asks the run to stop.
///
/// Work already dispatched keeps running; callers check the flag before
/// starting anything new.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Routes Ctrl-C to this token. Can only be installed once per process.
    pub fn install_ctrlc(&self) -> anyhow::Result<()> {
        let token = self.clone();
        ctrlc::set_handler(move || token.cancel()).context("Failed to install Ctrl-C handler")
    }
}
