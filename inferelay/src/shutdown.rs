//! Shutdown token for cooperative worker-pool termination.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A token for cooperative shutdown.
///
/// Shutdown is idempotent - only the first reason is kept.
#[derive(Default)]
pub struct ShutdownToken {
    /// Whether shutdown has been requested.
    requested: AtomicBool,
    /// The reason for shutdown (first one wins).
    reason: RwLock<Option<String>>,
    /// Wakes tasks parked on `wait()`.
    notify: Notify,
}

impl ShutdownToken {
    /// Creates a new shutdown token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown with a reason.
    ///
    /// This is idempotent - only the first reason is kept. Tasks waiting on
    /// `wait()` are woken.
    pub fn shutdown(&self, reason: impl Into<String>) {
        if self
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
            self.notify.notify_waiters();
        }
    }

    /// Returns whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Returns the shutdown reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Waits until shutdown is requested.
    pub async fn wait(&self) {
        loop {
            if self.is_shutdown() {
                return;
            }

            let mut notified = std::pin::pin!(self.notify.notified());
            // Register before re-checking the flag, so a shutdown between
            // the check and the await still wakes us.
            notified.as_mut().enable();
            if self.is_shutdown() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for ShutdownToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownToken")
            .field("requested", &self.is_shutdown())
            .field("reason", &self.reason())
            .finish()
    }
}
