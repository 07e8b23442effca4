//! Core abstractions for the edge streaming SSR runtime.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `RuntimeMode` / `RouteRenderMode` / `HostModel` - Process and route modes
//! - `RuntimeConfig` / `RouteConfig` - Configuration
//! - `RequestContext` - Per-request identity and timing
//! - `LifecyclePhase` - Request lifecycle tracking
//! - `Diagnostic` - Non-fatal directive conflict warnings

mod config;
mod context;
mod diagnostic;
mod error;
mod lifecycle;
mod mode;

pub use config::*;
pub use context::*;
pub use diagnostic::*;
pub use error::*;
pub use lifecycle::*;
pub use mode::*;
