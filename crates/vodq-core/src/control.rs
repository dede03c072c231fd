//! Process-wide shutdown signal for the worker loop.
//!
//! Process shutdown cancels the Pool Scheduler's tick loop; in-flight stage
//! executors run to completion of their current suspension point rather than
//! being hard-killed (spec §5). Items that were mid-stage at shutdown are
//! recovered by the Stuck-Task Supervisor on next boot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

/// Cloneable shutdown handle shared by the scheduler loop, the subscription
/// loops, and the supervisor. Cloning shares the same underlying flag.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; every `cancelled()` waiter wakes up.
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested. Used as the second arm of
    /// a `tokio::select!` around each suspension point in the scheduler loop
    /// (spec §5's "the only places the scheduler may yield").
    pub async fn cancelled(&self) {
        if self.is_requested() {
            return;
        }
        let notified = self.inner.notify.notified();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_resolves_after_request() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_requested());
        let waiter = shutdown.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        shutdown.request();
        handle.await.unwrap();
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_if_already_requested() {
        let shutdown = Shutdown::new();
        shutdown.request();
        shutdown.cancelled().await;
    }
}
