use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use imgate_core::error::{GateError, Result};

use crate::backend::{CallCtx, LogicBackend};

use super::store::{DeviceSession, SessionStore};
use super::users::{CodeVerifier, UserStore};

const TOKEN_LEN: usize = 40;

/// Result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInGrant {
    pub user_id: i64,
    pub token: String,
}

/// Issues and verifies per-device login tokens.
pub struct Authenticator {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    verifier: Arc<dyn CodeVerifier>,
    backend: Arc<dyn LogicBackend>,
    token_ttl: Months,
}

impl Authenticator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        verifier: Arc<dyn CodeVerifier>,
        backend: Arc<dyn LogicBackend>,
        token_ttl_months: u32,
    ) -> Self {
        Self {
            sessions,
            users,
            verifier,
            backend,
            token_ttl: Months::new(token_ttl_months),
        }
    }

    /// Verify the code, find or create the user, resolve the device, then
    /// write a fresh token for (user, device).
    ///
    /// A rejected code fails before any lookup, so it never creates a user
    /// nor touches the session store.
    pub async fn sign_in(
        &self,
        ctx: CallCtx,
        phone_number: &str,
        code: &str,
        device_id: i64,
    ) -> Result<SignInGrant> {
        if !self.verifier.verify(phone_number, code) {
            return Err(GateError::InvalidCode);
        }

        let user = match self.users.get_by_phone(phone_number).await.map_err(as_storage)? {
            Some(user) => user,
            None => {
                let user = self.users.add(phone_number).await.map_err(as_storage)?;
                info!(user_id = user.id, "user created on first sign-in");
                user
            }
        };

        let device = self
            .backend
            .get_device(ctx, device_id)
            .await
            .map_err(|e| GateError::Storage(format!("device lookup failed: {e}")))?;

        let token = random_token();
        let expire_at = self.expiry_from(Utc::now())?;
        self.sessions
            .set(
                user.id,
                device.device_id,
                DeviceSession {
                    device_type: device.r#type,
                    token: token.clone(),
                    expire_at,
                },
            )
            .await
            .map_err(as_storage)?;

        debug!(user_id = user.id, device_id = device.device_id, expire_at, "token issued");
        Ok(SignInGrant {
            user_id: user.id,
            token,
        })
    }

    /// Check that (user, device) holds an unexpired session for `token`.
    pub async fn verify(&self, user_id: i64, device_id: i64, token: &str) -> Result<()> {
        self.verify_at(user_id, device_id, token, Utc::now().timestamp())
            .await
    }

    /// `verify` against an explicit clock (unix seconds).
    pub async fn verify_at(&self, user_id: i64, device_id: i64, token: &str, now: i64) -> Result<()> {
        let session = self
            .sessions
            .get(user_id, device_id)
            .await
            .map_err(as_storage)?
            .ok_or(GateError::Unauthorized)?;

        if session.expire_at <= now {
            return Err(GateError::Unauthorized);
        }
        if !tokens_match(&session.token, token) {
            return Err(GateError::Unauthorized);
        }
        Ok(())
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Result<i64> {
        now.checked_add_months(self.token_ttl)
            .map(|t| t.timestamp())
            .ok_or_else(|| GateError::Internal("token expiry out of range".into()))
    }
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Compare without an early exit on the first differing byte.
fn tokens_match(stored: &str, presented: &str) -> bool {
    let (a, b) = (stored.as_bytes(), presented.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn as_storage(e: GateError) -> GateError {
    match e {
        GateError::Storage(_) => e,
        other => GateError::Storage(other.to_string()),
    }
}
