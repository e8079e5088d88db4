//! Dispatcher module exports.
//!
//! Re-exports the dispatcher and the per-connection state types so transports
//! can depend on this module directly.

pub mod conn;
pub mod dispatcher;

pub use conn::{ConnSession, ConnState, Outbound};
pub use dispatcher::{DispatchOptions, Dispatcher};
