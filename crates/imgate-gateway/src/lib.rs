//! imgate gateway library entry.
//!
//! This crate wires the transports, dispatcher, authentication, logic-service
//! adapters and connection registry into a cohesive gateway stack. It is
//! intended to be consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod auth;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod transport;
