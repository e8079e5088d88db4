//! Protocol modules.
//!
//! - `envelope`: the client-facing protobuf envelope and its typed payloads.
//! - `logic`: request/response messages of the logic-service RPC.
//! - `frame`: 2-byte length prefix framing for stream transports.
//!
//! All decoders are panic-free: malformed input is reported as `GateError`
//! instead of panicking or indexing raw buffers, keeping the gateway resilient
//! to hostile traffic.

pub mod envelope;
pub mod frame;
pub mod logic;
