//! Per-request deferred task scheduler.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use edge_observability::StructuredLogger;
use edge_streaming::FlushReceipt;
use futures::FutureExt;

use crate::pending::PendingWork;
use crate::task::{
    DeferredTask, DeferredTaskError, DrainReport, TaskCallback, TaskOutcome, TaskSource,
};

/// Default upper bound on a single deferred task.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct TaskQueue {
    tasks: VecDeque<DeferredTask>,
    next_id: u64,
    closed: bool,
}

#[derive(Debug, Clone)]
struct SharedQueue {
    queue: Arc<Mutex<TaskQueue>>,
    pending: PendingWork,
}

impl SharedQueue {
    fn lock(&self) -> MutexGuard<'_, TaskQueue> {
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn push(&self, source: TaskSource, callback: TaskCallback) {
        let mut queue = self.lock();
        if queue.closed {
            tracing::warn!(%source, "deferred task registered after the request finished; dropped");
            return;
        }

        let id = queue.next_id;
        queue.next_id += 1;
        queue.tasks.push_back(DeferredTask {
            id,
            source,
            registered_at: Utc::now(),
            callback,
        });
        self.pending.acquire();
    }

    /// Pop the next task, closing the queue once it is empty.
    fn pop_or_close(&self) -> Option<DeferredTask> {
        let mut queue = self.lock();
        let task = queue.tasks.pop_front();
        if task.is_none() {
            queue.closed = true;
        }
        task
    }

    /// Close the queue and discard everything in it.
    fn close_and_discard(&self) -> usize {
        let discarded = {
            let mut queue = self.lock();
            queue.closed = true;
            std::mem::take(&mut queue.tasks)
        };
        let count = discarded.len();
        self.pending.release(count as u64);
        count
    }
}

/// Holds one unit of pending work for a task taken off the queue.
///
/// Released on drop, so a drain cancelled mid-task still releases it.
struct InFlight<'a> {
    pending: &'a PendingWork,
}

impl<'a> InFlight<'a> {
    fn new(pending: &'a PendingWork) -> Self {
        Self { pending }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.pending.release(1);
    }
}

fn boxed<F, Fut>(callback: F) -> TaskCallback
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move || callback().boxed())
}

/// Cloneable handle through which rendering code registers deferred work.
///
/// Registration never suspends and never fails from the caller's view.
#[derive(Debug, Clone)]
pub struct DeferredRegistrar {
    shared: SharedQueue,
}

impl DeferredRegistrar {
    /// Register a callback to run after the response is flushed.
    #[track_caller]
    pub fn register<F, Fut>(&self, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.shared.push(TaskSource::caller(), boxed(callback));
    }

    /// Register a callback with a label identifying it in failure logs.
    #[track_caller]
    pub fn register_labeled<F, Fut>(&self, label: impl Into<String>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.shared
            .push(TaskSource::caller().with_label(label), boxed(callback));
    }

    /// Number of tasks waiting to run.
    pub fn queued(&self) -> usize {
        self.shared.lock().tasks.len()
    }
}

/// Owns one request's deferred tasks.
///
/// Tasks run in registration order, sequentially, once the response has
/// been flushed. Dropping the scheduler without draining discards its
/// tasks.
#[derive(Debug)]
pub struct DeferredTaskScheduler {
    shared: SharedQueue,
    task_timeout: Duration,
    logger: StructuredLogger,
}

impl DeferredTaskScheduler {
    /// Create a scheduler reporting failures through `logger`.
    pub fn new(pending: PendingWork, logger: StructuredLogger) -> Self {
        Self {
            shared: SharedQueue {
                queue: Arc::new(Mutex::new(TaskQueue::default())),
                pending,
            },
            task_timeout: DEFAULT_TASK_TIMEOUT,
            logger,
        }
    }

    /// Set the per-task timeout.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Get a registration handle for rendering code.
    pub fn registrar(&self) -> DeferredRegistrar {
        DeferredRegistrar {
            shared: self.shared.clone(),
        }
    }

    /// Register a callback to run after the response is flushed.
    #[track_caller]
    pub fn register<F, Fut>(&self, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.shared.push(TaskSource::caller(), boxed(callback));
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// Check if no tasks are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the outstanding-work tracker.
    pub fn pending(&self) -> &PendingWork {
        &self.shared.pending
    }

    /// Run every registered task, in registration order.
    ///
    /// Requires the flush receipt of the response, so it can only run after
    /// the last byte was written. Tasks registered while draining run in
    /// the same drain. A failing task is logged with its registration site
    /// and does not stop the remaining tasks.
    pub async fn drain(self, receipt: FlushReceipt) -> DrainReport {
        let started_at = Utc::now();
        tracing::debug!(
            request_id = %self.logger.request_id(),
            queued = self.len(),
            since_flush_us = receipt.instant().elapsed().as_micros() as u64,
            "draining deferred tasks"
        );

        let mut outcomes = Vec::new();
        while let Some(task) = self.shared.pop_or_close() {
            let _in_flight = InFlight::new(&self.shared.pending);
            outcomes.push(self.run(task).await);
        }

        let report = DrainReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        tracing::debug!(
            request_id = %self.logger.request_id(),
            executed = report.executed(),
            failed = report.failed(),
            "deferred tasks drained"
        );
        report
    }

    /// Discard every registered task without running it.
    ///
    /// Returns the number of discarded tasks.
    pub fn abort(self) -> usize {
        self.shared.close_and_discard()
    }

    async fn run(&self, task: DeferredTask) -> TaskOutcome {
        let DeferredTask {
            id,
            source,
            registered_at,
            callback,
        } = task;
        let started_at = Utc::now();

        let result = match std::panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(future) => {
                match tokio::time::timeout(self.task_timeout, AssertUnwindSafe(future).catch_unwind())
                    .await
                {
                    Ok(Ok(Ok(()))) => Ok(()),
                    Ok(Ok(Err(err))) => Err(DeferredTaskError::Failed(err)),
                    Ok(Err(panic)) => Err(DeferredTaskError::Panicked(panic_message(panic.as_ref()))),
                    Err(_) => Err(DeferredTaskError::TimedOut(self.task_timeout)),
                }
            }
            Err(panic) => Err(DeferredTaskError::Panicked(panic_message(panic.as_ref()))),
        };

        if let Err(err) = &result {
            self.logger
                .error_builder("Error in deferred task")
                .field_u64("task_id", id)
                .field("source", source.to_string())
                .field("error", err.to_string())
                .emit();
            tracing::error!(task_id = id, %source, error = %err, "deferred task failed");
        }

        TaskOutcome {
            id,
            source,
            registered_at,
            started_at,
            finished_at: Utc::now(),
            result,
        }
    }
}

impl Drop for DeferredTaskScheduler {
    fn drop(&mut self) {
        let discarded = self.shared.close_and_discard();
        if discarded > 0 {
            tracing::debug!(
                request_id = %self.logger.request_id(),
                discarded,
                "deferred tasks discarded without a response"
            );
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
