//! Realtime runtime: which connections live on this gateway, and push
//! delivery to them.

pub mod registry;

pub use registry::ConnRegistry;
