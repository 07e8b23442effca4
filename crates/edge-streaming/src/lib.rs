//! Response streaming and flush signalling for the edge SSR runtime.
//!
//! This crate provides:
//! - `StreamingSink` - Writes response bytes to any `Sink<Vec<u8>>` transport
//! - `FlushReceipt` - Proof that the last response byte reached the transport

mod receipt;
mod sink;

pub use receipt::*;
pub use sink::*;
