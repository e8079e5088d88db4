//! Sign-in token issuance and verification.
//!
//! `Authenticator` owns the device session records; the stores behind it are
//! traits so the gateway can run on memory in development and on Redis in
//! production.

pub mod api;
mod service;
mod store;
mod users;

pub use service::{Authenticator, SignInGrant};
pub use store::{DeviceSession, InMemorySessionStore, RedisSessionStore, SessionStore};
pub use users::{AcceptAnyCode, CodeVerifier, FixedCode, InMemoryUserStore, User, UserStore};
