//! Post-response deferred task execution.
//!
//! This crate runs work registered during rendering after the response
//! has been flushed:
//! - `DeferredTaskScheduler` - Per-request queue, drained once after flush
//! - `DeferredRegistrar` - Cloneable registration handle for rendering code
//! - `PendingWork` - Outstanding-work signal for ephemeral hosts
//! - `spawn_drain` - Host-model aware drain dispatch

mod deferred;
mod dispatch;
mod pending;
mod task;

pub use deferred::*;
pub use dispatch::*;
pub use pending::*;
pub use task::*;
