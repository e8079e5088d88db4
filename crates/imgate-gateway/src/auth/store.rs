use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use imgate_core::error::{GateError, Result};

/// Device session record keyed by (user_id, device_id).
///
/// Presence alone means nothing: a record whose `expire_at` is not in the
/// future counts as signed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSession {
    pub device_type: i32,
    pub token: String,
    /// Unix seconds.
    pub expire_at: i64,
}

/// Single-record atomic get/set. No locking across calls: the latest `set`
/// for a pair wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, user_id: i64, device_id: i64, session: DeviceSession) -> Result<()>;
    async fn get(&self, user_id: i64, device_id: i64) -> Result<Option<DeviceSession>>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<(i64, i64), DeviceSession>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn set(&self, user_id: i64, device_id: i64, session: DeviceSession) -> Result<()> {
        self.sessions.insert((user_id, device_id), session);
        Ok(())
    }

    async fn get(&self, user_id: i64, device_id: i64) -> Result<Option<DeviceSession>> {
        Ok(self
            .sessions
            .get(&(user_id, device_id))
            .map(|r| r.value().clone()))
    }
}

/// One hash per user (`imgate:auth:{user_id}`), one JSON field per device.
#[derive(Clone)]
pub struct RedisSessionStore {
    namespace: String,
    connection: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, namespace: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| GateError::BadRequest(format!("invalid redis url: {e}")))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| GateError::Storage(format!("redis connect failed: {e}")))?;
        Ok(Self {
            namespace: namespace.into(),
            connection,
        })
    }

    fn key(&self, user_id: i64) -> String {
        format!("{}:auth:{}", self.namespace, user_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn set(&self, user_id: i64, device_id: i64, session: DeviceSession) -> Result<()> {
        let payload = serde_json::to_string(&session)
            .map_err(|e| GateError::Internal(format!("session encode failed: {e}")))?;
        let mut conn = self.connection.clone();
        let _: () = conn
            .hset(self.key(user_id), device_id, payload)
            .await
            .map_err(|e| GateError::Storage(format!("redis hset failed: {e}")))?;
        Ok(())
    }

    async fn get(&self, user_id: i64, device_id: i64) -> Result<Option<DeviceSession>> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = conn
            .hget(self.key(user_id), device_id)
            .await
            .map_err(|e| GateError::Storage(format!("redis hget failed: {e}")))?;
        payload
            .map(|p| {
                serde_json::from_str(&p)
                    .map_err(|e| GateError::Storage(format!("corrupt session record: {e}")))
            })
            .transpose()
    }
}
