//! The data-fetch execution layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use edge_cache::{EffectiveCachePlan, FetchCallSpec};
use serde::de::DeserializeOwned;

use crate::client::FetchError;

/// A response produced by a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response headers.
    pub headers: HashMap<String, String>,
    /// The response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Create a new response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Get the response body as text.
    pub fn text(&self) -> Result<String, FetchError> {
        String::from_utf8(self.body.clone())
            .map_err(|e| FetchError::Deserialization(format!("Invalid UTF-8: {}", e)))
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::Deserialization(e.to_string()))
    }
}

/// Executes a resolved fetch call.
///
/// The runtime has already normalized the call, checked it for conflicts and
/// decided its cache plan; the fetcher performs the request and honours the
/// plan (cache lookup, storage, tags).
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request described by `spec` under `plan`.
    async fn fetch(
        &self,
        spec: &FetchCallSpec,
        plan: &EffectiveCachePlan,
    ) -> Result<FetchResponse, FetchError>;
}

/// One call recorded by a [`MemoryFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    /// The call as normalized.
    pub spec: FetchCallSpec,
    /// The plan it was dispatched with.
    pub plan: EffectiveCachePlan,
}

/// In-memory fetcher serving canned responses by cache key.
///
/// Unknown keys get a 404. Every dispatched call is recorded.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    routes: Arc<Mutex<HashMap<String, FetchResponse>>>,
    calls: Arc<Mutex<Vec<RecordedFetch>>>,
}

impl MemoryFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`.
    ///
    /// URLs that do not form a valid cache key are ignored.
    pub fn route(self, url: &str, response: FetchResponse) -> Self {
        match edge_cache::FetchKey::parse(url) {
            Ok(key) => {
                lock(&self.routes).insert(key.as_str().to_string(), response);
            }
            Err(err) => tracing::warn!(%url, error = %err, "ignoring unroutable url"),
        }
        self
    }

    /// Calls dispatched so far, in order.
    pub fn calls(&self) -> Vec<RecordedFetch> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(
        &self,
        spec: &FetchCallSpec,
        plan: &EffectiveCachePlan,
    ) -> Result<FetchResponse, FetchError> {
        lock(&self.calls).push(RecordedFetch {
            spec: spec.clone(),
            plan: plan.clone(),
        });

        let response = lock(&self.routes)
            .get(spec.key.as_str())
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, "not found"));

        Ok(response.with_header("Cache-Control", plan.cache_control_header()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
