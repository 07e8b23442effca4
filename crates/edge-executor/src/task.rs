//! Deferred task records and outcomes.

use std::fmt;
use std::panic::Location;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

/// Future produced by a deferred callback.
pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;

pub(crate) type TaskCallback = Box<dyn FnOnce() -> TaskFuture + Send>;

/// Where a deferred task was registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskSource {
    file: &'static str,
    line: u32,
    column: u32,
    label: Option<String>,
}

impl TaskSource {
    /// Capture the caller's source location.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    /// Build from an explicit source location.
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
            label: None,
        }
    }

    /// Attach a human-readable label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Source file of the registration.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Source line of the registration.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Label given at registration, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({}:{}:{})", label, self.file, self.line, self.column),
            None => write!(f, "{}:{}:{}", self.file, self.line, self.column),
        }
    }
}

/// A callback registered during rendering, run after the response is flushed.
pub struct DeferredTask {
    /// Monotonic id within the request.
    pub id: u64,
    /// Registration site.
    pub source: TaskSource,
    /// Registration time.
    pub registered_at: DateTime<Utc>,
    pub(crate) callback: TaskCallback,
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTask")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}

/// Why a deferred task did not complete successfully.
#[derive(Debug, thiserror::Error)]
pub enum DeferredTaskError {
    #[error("{0:#}")]
    Failed(anyhow::Error),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Result of running one deferred task.
#[derive(Debug)]
pub struct TaskOutcome {
    /// Task id.
    pub id: u64,
    /// Registration site.
    pub source: TaskSource,
    /// Registration time.
    pub registered_at: DateTime<Utc>,
    /// When the task started running.
    pub started_at: DateTime<Utc>,
    /// When the task finished.
    pub finished_at: DateTime<Utc>,
    /// Task result.
    pub result: Result<(), DeferredTaskError>,
}

impl TaskOutcome {
    /// Check if the task succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of one drain.
#[derive(Debug)]
pub struct DrainReport {
    /// When the drain started.
    pub started_at: DateTime<Utc>,
    /// When the drain finished.
    pub finished_at: DateTime<Utc>,
    /// Outcomes in execution order.
    pub outcomes: Vec<TaskOutcome>,
}

impl DrainReport {
    /// Number of tasks executed.
    pub fn executed(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of tasks that succeeded.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of tasks that failed, panicked or timed out.
    pub fn failed(&self) -> usize {
        self.executed() - self.succeeded()
    }

    /// Ids in execution order.
    pub fn execution_order(&self) -> Vec<u64> {
        self.outcomes.iter().map(|o| o.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_captures_caller() {
        let source = TaskSource::caller();
        assert!(source.file().ends_with("task.rs"));
        assert!(source.line() > 0);
        assert!(source.label().is_none());
    }

    #[test]
    fn test_source_display() {
        let source = TaskSource::caller().with_label("audit-log");
        let text = source.to_string();
        assert!(text.starts_with("audit-log ("));
        assert!(text.contains("task.rs:"));
    }

    #[test]
    fn test_error_display() {
        let err = DeferredTaskError::Failed(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "boom");

        let err = DeferredTaskError::TimedOut(Duration::from_millis(5));
        assert_eq!(err.to_string(), "timed out after 5ms");
    }
}
