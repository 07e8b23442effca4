//! Platform-controlled streaming sink.

use std::fmt::Display;

use edge_core::{LifecyclePhase, RenderError, TimingContext};
use futures::{Sink, SinkExt};

use crate::receipt::FlushReceipt;

/// State of the streaming sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    /// Nothing written yet.
    Initial,
    /// At least one chunk has been written.
    Streaming,
    /// Transport flushed and closed.
    Finished,
}

/// Platform-controlled streaming sink for one response.
///
/// This is generic over the underlying sink type to work with any
/// `Sink<Vec<u8>>` implementation.
pub struct StreamingSink<S, E>
where
    S: Sink<Vec<u8>, Error = E> + Unpin,
    E: Display,
{
    inner: S,
    state: SinkState,
    timing: TimingContext,
    bytes_written: usize,
}

impl<S, E> StreamingSink<S, E>
where
    S: Sink<Vec<u8>, Error = E> + Unpin,
    E: Display,
{
    /// Create a new streaming sink.
    pub fn new(sink: S, timing: TimingContext) -> Self {
        Self {
            inner: sink,
            state: SinkState::Initial,
            timing,
            bytes_written: 0,
        }
    }

    /// Write a chunk of response bytes.
    pub async fn send_chunk(&mut self, bytes: Vec<u8>) -> Result<(), RenderError> {
        if self.state == SinkState::Finished {
            return Err(RenderError::AlreadyFinished);
        }

        if self.state == SinkState::Initial {
            self.timing.mark("first_byte");
        }

        let len = bytes.len();
        self.inner
            .send(bytes)
            .await
            .map_err(|e| RenderError::StreamError(e.to_string()))?;
        self.bytes_written += len;
        self.state = SinkState::Streaming;

        Ok(())
    }

    /// Write a chunk of HTML.
    pub async fn send_html(&mut self, html: &str) -> Result<(), RenderError> {
        self.send_chunk(html.as_bytes().to_vec()).await
    }

    /// Flush and close the transport.
    ///
    /// Returns the receipt that authorises deferred work to start.
    pub async fn finish(&mut self) -> Result<FlushReceipt, RenderError> {
        if self.state == SinkState::Finished {
            return Err(RenderError::AlreadyFinished);
        }

        self.inner
            .close()
            .await
            .map_err(|e| RenderError::StreamError(e.to_string()))?;
        self.timing.mark("flushed");
        self.state = SinkState::Finished;

        tracing::debug!(bytes = self.bytes_written, "response flushed");
        Ok(FlushReceipt::now(self.bytes_written))
    }

    /// Get the current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        match self.state {
            SinkState::Initial => LifecyclePhase::Start,
            SinkState::Streaming => LifecyclePhase::Streaming,
            SinkState::Finished => LifecyclePhase::Flushed,
        }
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Get timing context reference.
    pub fn timing(&self) -> &TimingContext {
        &self.timing
    }

    /// Consume the sink and return the inner value.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_finish_returns_receipt() {
        let (tx, rx) = mpsc::unbounded::<Vec<u8>>();
        let mut sink = StreamingSink::new(tx, TimingContext::new());

        assert_eq!(sink.phase(), LifecyclePhase::Start);
        sink.send_html("<html>").await.unwrap();
        sink.send_html("</html>").await.unwrap();
        assert_eq!(sink.phase(), LifecyclePhase::Streaming);

        let receipt = sink.finish().await.unwrap();
        assert_eq!(receipt.bytes_written(), 13);
        assert_eq!(sink.phase(), LifecyclePhase::Flushed);
        assert!(sink.timing().time_to_flush().is_some());

        let body: Vec<Vec<u8>> = rx.collect().await;
        assert_eq!(body.concat(), b"<html></html>");
    }

    #[tokio::test]
    async fn test_write_after_finish_fails() {
        let (tx, _rx) = mpsc::unbounded::<Vec<u8>>();
        let mut sink = StreamingSink::new(tx, TimingContext::new());
        sink.finish().await.unwrap();

        assert!(matches!(
            sink.send_html("late").await,
            Err(RenderError::AlreadyFinished)
        ));
        assert!(matches!(sink.finish().await, Err(RenderError::AlreadyFinished)));
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let (tx, rx) = mpsc::unbounded::<Vec<u8>>();
        drop(rx);
        let mut sink = StreamingSink::new(tx, TimingContext::new());

        assert!(matches!(
            sink.send_html("body").await,
            Err(RenderError::StreamError(_))
        ));
    }
}
