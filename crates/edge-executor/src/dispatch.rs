//! Host-model aware drain dispatch.

use std::time::Duration;

use edge_core::HostModel;
use edge_streaming::FlushReceipt;
use tokio::task::JoinHandle;

use crate::deferred::DeferredTaskScheduler;
use crate::pending::PendingWork;
use crate::task::DrainReport;

/// Handle to a drain running in the background.
#[derive(Debug)]
pub struct DrainHandle {
    host: HostModel,
    pending: PendingWork,
    join: JoinHandle<DrainReport>,
}

impl DrainHandle {
    /// Host model the drain was dispatched for.
    pub fn host(&self) -> HostModel {
        self.host
    }

    /// Outstanding-work tracker shared with the host.
    pub fn pending(&self) -> &PendingWork {
        &self.pending
    }

    /// Wait for the drain to finish.
    ///
    /// Returns `None` if the drain task was cancelled by runtime shutdown.
    pub async fn join(self) -> Option<DrainReport> {
        match self.join.await {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::error!(error = %err, "deferred task drain did not complete");
                None
            }
        }
    }

    /// Block process termination until the drain's work is done.
    ///
    /// Long-running hosts return immediately; ephemeral hosts wait on the
    /// pending-work signal. Returns false if work was still outstanding
    /// when the timeout elapsed.
    pub async fn hold_termination(&self, timeout: Duration) -> bool {
        if !self.host.requires_pending_signal() {
            return true;
        }
        self.pending.wait_idle(timeout).await
    }
}

/// Start draining a request's deferred tasks without delaying the response path.
///
/// The drain runs on the tokio runtime. On a long-running host nothing else
/// is needed; an ephemeral host must call
/// [`DrainHandle::hold_termination`] (or wait on [`PendingWork`]) before it
/// lets the process exit.
pub fn spawn_drain(
    scheduler: DeferredTaskScheduler,
    receipt: FlushReceipt,
    host: HostModel,
) -> DrainHandle {
    spawn_drain_with(scheduler, receipt, host, |_| {})
}

/// Like [`spawn_drain`], calling `on_drained` with the report once every task has run.
pub fn spawn_drain_with<H>(
    scheduler: DeferredTaskScheduler,
    receipt: FlushReceipt,
    host: HostModel,
    on_drained: H,
) -> DrainHandle
where
    H: FnOnce(&DrainReport) + Send + 'static,
{
    let pending = scheduler.pending().clone();
    tracing::trace!(%host, queued = scheduler.len(), "dispatching deferred task drain");
    let join = tokio::spawn(async move {
        let report = scheduler.drain(receipt).await;
        on_drained(&report);
        report
    });

    DrainHandle {
        host,
        pending,
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_observability::{MemorySink, RequestId, StructuredLogger};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn scheduler(pending: &PendingWork) -> DeferredTaskScheduler {
        let logger = StructuredLogger::new(
            RequestId::from_string("req-1"),
            Arc::new(MemorySink::new()),
        );
        DeferredTaskScheduler::new(pending.clone(), logger)
    }

    #[tokio::test]
    async fn test_ephemeral_host_holds_termination() {
        let pending = PendingWork::new();
        let scheduler = scheduler(&pending);
        let done = Arc::new(AtomicBool::new(false));

        let flag = done.clone();
        scheduler.register(move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        let handle = spawn_drain(scheduler, FlushReceipt::now(0), HostModel::Ephemeral);
        assert!(!pending.is_idle());

        assert!(handle.hold_termination(Duration::from_secs(5)).await);
        assert!(done.load(Ordering::SeqCst));

        let report = handle.join().await.unwrap();
        assert_eq!(report.succeeded(), 1);
    }

    #[tokio::test]
    async fn test_long_running_host_does_not_hold() {
        let pending = PendingWork::new();
        let scheduler = scheduler(&pending);
        scheduler.register(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        });

        let handle = spawn_drain(scheduler, FlushReceipt::now(0), HostModel::LongRunning);
        assert!(handle.hold_termination(Duration::from_millis(1)).await);
        assert_eq!(handle.host(), HostModel::LongRunning);

        let report = handle.join().await.unwrap();
        assert_eq!(report.executed(), 1);
        assert!(pending.is_idle());
    }

    #[tokio::test]
    async fn test_drained_hook_sees_report() {
        let pending = PendingWork::new();
        let scheduler = scheduler(&pending);
        scheduler.register(|| async { Ok(()) });
        scheduler.register(|| async { Err::<(), _>(anyhow::anyhow!("nope")) });

        let seen = Arc::new(std::sync::Mutex::new(None));
        let slot = seen.clone();
        let handle = spawn_drain_with(
            scheduler,
            FlushReceipt::now(0),
            HostModel::LongRunning,
            move |report| {
                *slot.lock().unwrap() = Some((report.succeeded(), report.failed()));
            },
        );

        handle.join().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some((1, 1)));
    }
}
