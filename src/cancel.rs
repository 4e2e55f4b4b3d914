//! Cooperative cancellation shared between the orchestrator and its components
//!
//! A token is cheap to clone; all clones observe the same flag. Loops check
//! it between iterations and in-flight network calls race against
//! [`CancellationToken::cancelled`] so that dropping the losing future aborts
//! the request.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Marker returned when a run was cancelled. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("test cancelled")
    }
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancellation signal
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create a new non-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake every waiter. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Checkpoint for sequential code: `token.check()?`
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking the flag so a concurrent cancel is not lost
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Drive `future` unless the token fires first; `None` means cancelled
    pub async fn run_until_cancelled<F>(&self, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = future => Some(output),
        }
    }

    /// Sleep for `duration`; returns `Err(Cancelled)` if woken early by a cancel
    pub async fn sleep(&self, duration: std::time::Duration) -> Result<(), Cancelled> {
        match self.run_until_cancelled(tokio::time::sleep(duration)).await {
            Some(()) => Ok(()),
            None => Err(Cancelled),
        }
    }
}
