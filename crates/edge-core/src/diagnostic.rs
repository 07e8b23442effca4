//! Non-fatal warnings about conflicting caching directives.

use std::fmt;

use http::Method;

/// A warning produced for one fetch call.
///
/// Created by the conflict detector, consumed immediately by the
/// diagnostics emitter and discarded after emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Dedup key derived from the fetch URL and query.
    pub key: String,
    /// Method of the fetch call.
    pub method: Method,
    /// URL of the fetch call, as written by the caller.
    pub url: String,
    /// Human-readable warning.
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        key: impl Into<String>,
        method: Method,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            method,
            url: url.into(),
            message: message.into(),
        }
    }

    /// The request identity, e.g. `GET https://example.com/api`.
    pub fn request_line(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.request_line(), self.message)
    }
}
