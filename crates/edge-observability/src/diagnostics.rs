//! Development-mode emission of directive conflict diagnostics.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use edge_core::{Diagnostic, RuntimeMode};

use crate::sink::LogSink;

/// Prefix of the request identity line.
pub const REQUEST_LINE_PREFIX: &str = " │ ";
/// Prefix of the warning line under a request identity line.
pub const WARNING_LINE_PREFIX: &str = " │ │ ⚠ ";

/// What happened to a diagnostic handed to a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// Written to the sink.
    Emitted,
    /// Already written in this request; only the identity line was written.
    Duplicate,
    /// Runtime mode is production; nothing was written.
    Suppressed,
}

/// Process-level emitter. Hands out one [`DiagnosticScope`] per request.
#[derive(Clone)]
pub struct DiagnosticsEmitter {
    mode: RuntimeMode,
    sink: Arc<dyn LogSink>,
}

impl DiagnosticsEmitter {
    /// Create an emitter for the given runtime mode.
    pub fn new(mode: RuntimeMode, sink: Arc<dyn LogSink>) -> Self {
        Self { mode, sink }
    }

    /// Check if diagnostics reach the sink at all.
    pub fn is_enabled(&self) -> bool {
        self.mode.emits_diagnostics()
    }

    /// Get the runtime mode.
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Open a dedup scope for one request/response cycle.
    pub fn scope(&self) -> DiagnosticScope {
        DiagnosticScope {
            emitter: self.clone(),
            emitted: Mutex::new(HashSet::new()),
        }
    }

    /// Format the two lines written for a diagnostic.
    pub fn format_lines(diagnostic: &Diagnostic) -> [String; 2] {
        [
            format!("{}{}", REQUEST_LINE_PREFIX, diagnostic.request_line()),
            format!("{}{}", WARNING_LINE_PREFIX, diagnostic.message),
        ]
    }
}

impl fmt::Debug for DiagnosticsEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticsEmitter")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Per-request emission scope.
///
/// Remembers which `(key, message)` pairs were already written so a
/// warning appears at most once per request. Dropped with the request.
pub struct DiagnosticScope {
    emitter: DiagnosticsEmitter,
    emitted: Mutex<HashSet<(String, String)>>,
}

impl DiagnosticScope {
    /// Emit a diagnostic.
    ///
    /// The identity line is written for every call; the warning line only
    /// the first time its `(key, message)` pair is seen in this scope.
    pub fn emit(&self, diagnostic: &Diagnostic) -> Emission {
        if !self.emitter.is_enabled() {
            return Emission::Suppressed;
        }

        let [request_line, warning_line] = DiagnosticsEmitter::format_lines(diagnostic);
        let first = {
            let mut emitted = match self.emitted.lock() {
                Ok(set) => set,
                Err(poisoned) => poisoned.into_inner(),
            };
            emitted.insert((diagnostic.key.clone(), diagnostic.message.clone()))
        };

        self.emitter.sink.write_line(&request_line);
        if first {
            self.emitter.sink.write_line(&warning_line);
            Emission::Emitted
        } else {
            tracing::trace!(key = %diagnostic.key, "duplicate diagnostic suppressed");
            Emission::Duplicate
        }
    }

    /// Number of distinct diagnostics written in this scope.
    pub fn emitted_count(&self) -> usize {
        match self.emitted.lock() {
            Ok(set) => set.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl fmt::Debug for DiagnosticScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticScope")
            .field("mode", &self.emitter.mode)
            .field("emitted", &self.emitted_count())
            .finish()
    }
}
