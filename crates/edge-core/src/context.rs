//! Request context with route-level declarations.

use std::sync::atomic::{AtomicU64, Ordering};

use http::Method;

use crate::config::RouteConfig;
use crate::lifecycle::TimingContext;
use crate::mode::RouteRenderMode;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:x}", nanos, seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context for one request/response cycle.
///
/// The render mode is fixed before any fetch call runs and never changes
/// during the render.
#[derive(Debug)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method of the incoming request.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Rendering mode declared by the matched route.
    render_mode: RouteRenderMode,
    /// Timing context for observability.
    pub timing: TimingContext,
}

impl RequestContext {
    /// Create a new request context for a static route.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            method,
            path: path.into(),
            render_mode: RouteRenderMode::default(),
            timing: TimingContext::new(),
        }
    }

    /// Create a context for a request matched to a configured route.
    pub fn for_route(route: &RouteConfig, method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path).with_render_mode(route.render_mode)
    }

    /// Declare the route's rendering mode.
    pub fn with_render_mode(mut self, mode: RouteRenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Use an existing request ID (e.g., propagated from an upstream proxy).
    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = id;
        self
    }

    /// Get the route's rendering mode.
    pub fn render_mode(&self) -> RouteRenderMode {
        self.render_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_request_context_for_route() {
        let route = RouteConfig::new("/feed", "feed").with_render_mode(RouteRenderMode::ForceDynamic);
        let ctx = RequestContext::for_route(&route, Method::GET, "/feed");

        assert_eq!(ctx.render_mode(), RouteRenderMode::ForceDynamic);
        assert_eq!(ctx.path, "/feed");
    }

    #[test]
    fn test_request_context_default_static() {
        let ctx = RequestContext::new(Method::GET, "/")
            .with_request_id(RequestId::from_string("req-1"));
        assert_eq!(ctx.render_mode(), RouteRenderMode::Static);
        assert_eq!(ctx.request_id.as_str(), "req-1");
    }
}
