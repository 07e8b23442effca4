//! Per-request fetch client with directive resolution.

use std::sync::Arc;

use edge_cache::{normalize, resolve, DirectiveError, FetchCallSpec, FetchInput, FetchResolution};
use edge_core::{RequestId, RouteRenderMode};
use edge_observability::{DiagnosticScope, Emission};
use serde::de::DeserializeOwned;

use crate::fetcher::{FetchResponse, Fetcher};

/// Error type for fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid fetch input: {0}")]
    Input(#[from] DirectiveError),

    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Request error: {0}")]
    Request(String),
}

/// A fetch call that has been normalized, checked and planned but not sent.
#[derive(Debug, Clone)]
pub struct PreparedFetch {
    /// The canonical directive record.
    pub spec: FetchCallSpec,
    /// Conflict and caching decision.
    pub resolution: FetchResolution,
    /// What happened to the call's diagnostic.
    pub emission: Option<Emission>,
}

/// Platform-controlled fetch client for one request.
///
/// Every call is normalized, checked for conflicting cache directives and
/// planned before the [`Fetcher`] sees it. Diagnostics are written through
/// the request's [`DiagnosticScope`], so a repeated conflict warns once.
pub struct FetchClient {
    request_id: RequestId,
    render_mode: RouteRenderMode,
    diagnostics: DiagnosticScope,
    fetcher: Arc<dyn Fetcher>,
}

impl FetchClient {
    /// Create a new fetch client.
    pub fn new(
        request_id: RequestId,
        render_mode: RouteRenderMode,
        diagnostics: DiagnosticScope,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            request_id,
            render_mode,
            diagnostics,
            fetcher,
        }
    }

    /// Resolve a call's directives and emit its diagnostic, without dispatching.
    ///
    /// Runs synchronously, so the warning is written before the fetch starts.
    pub fn prepare(&self, input: &FetchInput) -> Result<PreparedFetch, FetchError> {
        let spec = normalize(input)?;
        let resolution = resolve(&spec, self.render_mode);
        let emission = resolution
            .diagnostic
            .as_ref()
            .map(|diagnostic| self.diagnostics.emit(diagnostic));

        tracing::debug!(
            request_id = %self.request_id,
            method = %spec.method,
            url = %spec.url,
            cached = resolution.plan.cached,
            ttl = ?resolution.plan.ttl_seconds,
            conflict = resolution.conflict.is_some(),
            "fetch resolved"
        );

        Ok(PreparedFetch {
            spec,
            resolution,
            emission,
        })
    }

    /// Fetch a URL or request-like input.
    pub async fn fetch(&self, input: impl Into<FetchInput>) -> Result<FetchResponse, FetchError> {
        let prepared = self.prepare(&input.into())?;
        self.fetcher
            .fetch(&prepared.spec, &prepared.resolution.plan)
            .await
    }

    /// Fetch and deserialize a JSON body, failing on non-2xx statuses.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        input: impl Into<FetchInput>,
    ) -> Result<T, FetchError> {
        let input = input.into();
        let url = match &input {
            FetchInput::Url { url, .. } => url.clone(),
            FetchInput::Request { request, .. } => request.url().to_string(),
        };

        let response = self.fetch(input).await?;
        if !response.is_success() {
            return Err(FetchError::Http {
                status: response.status,
                url,
            });
        }
        response.json()
    }

    /// Render mode the client resolves against.
    pub fn render_mode(&self) -> RouteRenderMode {
        self.render_mode
    }

    /// Diagnostics scope of this request.
    pub fn diagnostics(&self) -> &DiagnosticScope {
        &self.diagnostics
    }

    /// Get the request ID.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("request_id", &self.request_id)
            .field("render_mode", &self.render_mode)
            .finish_non_exhaustive()
    }
}
