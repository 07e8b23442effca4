//! Response flush signal.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// Proof that a response has been fully written to its transport.
///
/// Produced by [`StreamingSink::finish`](crate::StreamingSink::finish).
/// Deferred work takes a receipt by value, so it cannot start before the
/// response is flushed. Transports that write responses themselves create
/// one with [`FlushReceipt::now`] after their last byte is written, never
/// earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReceipt {
    flushed_at: DateTime<Utc>,
    instant: Instant,
    bytes_written: usize,
}

impl FlushReceipt {
    /// Record a flush that completed just now.
    pub fn now(bytes_written: usize) -> Self {
        Self {
            flushed_at: Utc::now(),
            instant: Instant::now(),
            bytes_written,
        }
    }

    /// Wall-clock time of the flush.
    pub fn flushed_at(&self) -> DateTime<Utc> {
        self.flushed_at
    }

    /// Monotonic time of the flush.
    pub fn instant(&self) -> Instant {
        self.instant
    }

    /// Total response bytes written.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}
