//! Outstanding deferred work tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct PendingInner {
    count: AtomicU64,
    idle: Notify,
}

/// Counter of deferred tasks registered but not yet finished.
///
/// Incremented on registration, decremented as each task completes or is
/// discarded. An ephemeral host waits for it to reach zero before letting
/// the process terminate.
#[derive(Debug, Clone, Default)]
pub struct PendingWork {
    inner: Arc<PendingInner>,
}

impl PendingWork {
    /// Create a new tracker with no outstanding work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one newly registered task.
    pub fn acquire(&self) {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Record `n` tasks as finished or discarded.
    pub fn release(&self, n: u64) {
        if n == 0 {
            return;
        }
        let previous = self
            .inner
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some(c.saturating_sub(n)))
            .unwrap_or(0);
        if previous <= n {
            self.inner.idle.notify_waiters();
        }
    }

    /// Number of outstanding tasks.
    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Check if no work is outstanding.
    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }

    /// Wait until no work is outstanding.
    ///
    /// Returns true if idle within the timeout, false otherwise.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return true;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let idle = self.is_idle();
                if !idle {
                    tracing::warn!(
                        outstanding = self.count(),
                        "pending deferred work did not finish before timeout"
                    );
                }
                return idle;
            }
        }
    }
}
