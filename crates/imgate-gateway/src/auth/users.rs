use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use imgate_core::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub phone_number: String,
}

/// User directory consulted by sign-in.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_phone(&self, phone_number: &str) -> Result<Option<User>>;
    /// Create a user and return it with its assigned id.
    async fn add(&self, phone_number: &str) -> Result<User>;
}

/// `phone -> user`, ids from a monotonically increasing counter.
pub struct InMemoryUserStore {
    users: DashMap<String, User>,
    seq: AtomicI64,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            seq: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_by_phone(&self, phone_number: &str) -> Result<Option<User>> {
        Ok(self.users.get(phone_number).map(|r| r.value().clone()))
    }

    async fn add(&self, phone_number: &str) -> Result<User> {
        let user = self
            .users
            .entry(phone_number.to_string())
            .or_insert_with(|| User {
                id: self.seq.fetch_add(1, Ordering::Relaxed),
                phone_number: phone_number.to_string(),
            })
            .value()
            .clone();
        Ok(user)
    }
}

/// Verification-code check (SMS or similar). Pass/fail only.
pub trait CodeVerifier: Send + Sync {
    fn verify(&self, phone_number: &str, code: &str) -> bool;
}

/// Accepts every code. Development only.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAnyCode;

impl CodeVerifier for AcceptAnyCode {
    fn verify(&self, _phone_number: &str, _code: &str) -> bool {
        true
    }
}

/// Accepts one configured code for every phone number.
#[derive(Debug, Clone)]
pub struct FixedCode(pub String);

impl CodeVerifier for FixedCode {
    fn verify(&self, _phone_number: &str, code: &str) -> bool {
        self.0 == code
    }
}
