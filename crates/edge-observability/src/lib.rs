//! Observability infrastructure for the edge streaming SSR runtime.
//!
//! This crate provides:
//! - `LogSink` - Injected line-oriented log destination (`MemorySink`, `StderrSink`, `TracingSink`)
//! - `DiagnosticsEmitter` / `DiagnosticScope` - Per-request deduplicated conflict warnings
//! - `StructuredLogger` - Structured logging with request context

mod diagnostics;
mod logging;
mod sink;

pub use diagnostics::*;
pub use logging::*;
pub use sink::*;

// Re-export shared types from edge-core for convenience
pub use edge_core::{LogFormat, RequestId};
