//! Line-oriented log sinks.

use std::sync::{Arc, Mutex};

/// Append-only, line-oriented log destination.
///
/// Injected into emitters and loggers so tests can substitute an
/// in-memory sink.
pub trait LogSink: Send + Sync {
    /// Append one line. The line must not contain a trailing newline.
    fn write_line(&self, line: &str);
}

/// In-memory sink that accumulates text for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the accumulated text.
    pub fn contents(&self) -> String {
        match self.buffer.lock() {
            Ok(buffer) => buffer.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Check if the accumulated text contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }

    /// Count non-overlapping occurrences of `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }

    /// Get the accumulated lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }

    /// Discard the accumulated text.
    pub fn clear(&self) {
        match self.buffer.lock() {
            Ok(mut buffer) => buffer.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        let mut buffer = match self.buffer.lock() {
            Ok(buffer) => buffer,
            Err(poisoned) => poisoned.into_inner(),
        };
        buffer.push_str(line);
        buffer.push('\n');
    }
}

/// Sink writing to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write_line(&self, line: &str) {
        eprintln!("{}", line);
    }
}

/// Sink forwarding every line to `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::warn!(target: "edge::log", "{}", line);
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write_line(&self, line: &str) {
        (**self).write_line(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_accumulates_lines() {
        let sink = MemorySink::new();
        sink.write_line("first");
        sink.write_line("second");

        assert_eq!(sink.lines(), vec!["first", "second"]);
        assert!(sink.contains("second"));
        assert!(!sink.contains("third"));
    }

    #[test]
    fn test_memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let shared: Arc<dyn LogSink> = Arc::new(sink.clone());
        shared.write_line("via trait object");

        assert!(sink.contains("via trait object"));
        assert_eq!(sink.count("trait"), 1);

        sink.clear();
        assert!(sink.contents().is_empty());
    }
}
