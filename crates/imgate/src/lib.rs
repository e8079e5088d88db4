//! Top-level facade crate for imgate.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use imgate_core::*;
}

pub mod gateway {
    pub use imgate_gateway::*;
}
