//! Public SDK for the edge streaming SSR runtime.
//!
//! This crate re-exports all runtime functionality and ties it together
//! per request:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! let runtime = EdgeRuntime::new(RuntimeConfig::load("edge.toml")?.with_env()?, fetcher);
//!
//! let scope = runtime.begin(RequestContext::for_route(&route, Method::GET, "/products"));
//! let products = scope
//!     .fetch(FetchInput::url_with(url, FetchOptions::new().revalidate(60)))
//!     .await?;
//!
//! scope.after(move || async move {
//!     audit.record("products viewed").await?;
//!     Ok(())
//! });
//!
//! sink.send_html(&render(&products)).await?;
//! let drain = scope.complete(&mut sink).await?;
//! drain.hold_termination(Duration::from_secs(30)).await;
//! ```

mod runtime;

pub use runtime::*;

pub use edge_cache;
pub use edge_core;
pub use edge_data;
pub use edge_executor;
pub use edge_observability;
pub use edge_streaming;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::runtime::*;
    pub use edge_cache::*;
    pub use edge_core::*;
    pub use edge_data::*;
    pub use edge_executor::*;
    pub use edge_observability::*;
    pub use edge_streaming::*;
    pub use http::Method;
}
