//! imgate core: transport-agnostic protocol types and the shared error surface.
//!
//! This crate defines the envelope schema, the logic-service RPC messages, the
//! stream framing, and the error taxonomy used by the gateway. It carries no
//! transport or runtime dependencies so it can be reused by clients and tools.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `GateError`/`Result` so a malformed
//! frame can never take a gateway process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{GateError, Result};
