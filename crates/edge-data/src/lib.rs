//! Data access layer resolving fetch cache directives before dispatch.
//!
//! This crate provides:
//! - `FetchClient` - Per-request fetch boundary: normalize, check, warn, plan, dispatch
//! - `Fetcher` - The external data-fetch execution layer
//! - `FetchResponse` - Response returned by a `Fetcher`

mod client;
mod fetcher;

pub use client::*;
pub use fetcher::*;
