//! Transport adapters.
//!
//! Both feed raw envelope bytes to the dispatcher one frame at a time and
//! drain the connection's outbound queue:
//! - `ws`: WebSocket upgrade, one binary message per envelope.
//! - `tcp`: raw TCP with 2-byte length framing.

pub mod codec;
pub mod tcp;
pub mod ws;
