//! Fetch cache directive resolution for the edge streaming SSR runtime.
//!
//! This crate provides:
//! - `FetchInput` / `normalize` - Canonical `FetchCallSpec` from a URL or request-like input
//! - `FetchKey` - Cache and dedup key derived from the URL and query
//! - `detect_conflict` - Conflicting directive detection
//! - `plan_cache` / `resolve` - The `EffectiveCachePlan` a fetch call actually uses
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::{normalize, resolve, CacheMode, FetchInput, FetchOptions};
//! use edge_core::RouteRenderMode;
//!
//! let input = FetchInput::url_with(
//!     "https://api.example.com/products",
//!     FetchOptions::new().cache(CacheMode::NoStore).revalidate(3),
//! );
//! let spec = normalize(&input)?;
//! let resolution = resolve(&spec, RouteRenderMode::Static);
//!
//! assert!(!resolution.plan.cached);
//! assert!(resolution.diagnostic.is_some());
//! ```

mod conflict;
mod directive;
mod error;
mod key;
mod plan;

pub use conflict::*;
pub use directive::*;
pub use error::*;
pub use key::*;
pub use plan::*;
