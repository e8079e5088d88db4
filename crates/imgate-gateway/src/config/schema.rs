use serde::Deserialize;

use imgate_core::error::{GateError, Result};
use imgate_core::protocol::frame::MAX_FRAME_LEN;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub logic: LogicSection,

    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub dispatch: DispatchSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GateError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.logic.validate()?;
        self.auth.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    /// HTTP + WebSocket listener.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Optional length-framed TCP listener.
    #[serde(default)]
    pub tcp_listen: Option<String>,

    /// Address announced to the logic service on sign-in, so pushes for a
    /// connection can be routed back to this instance.
    #[serde(default = "default_conn_addr")]
    pub conn_addr: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            tcp_listen: None,
            conn_addr: default_conn_addr(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(GateError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(GateError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(GateError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(16..=MAX_FRAME_LEN).contains(&self.max_frame_bytes) {
            return Err(GateError::BadRequest(format!(
                "gateway.max_frame_bytes must be between 16 and {MAX_FRAME_LEN}"
            )));
        }
        if self.outbound_queue == 0 {
            return Err(GateError::BadRequest(
                "gateway.outbound_queue must be positive".into(),
            ));
        }
        if self.conn_addr.is_empty() {
            return Err(GateError::BadRequest("gateway.conn_addr must not be empty".into()));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_conn_addr() -> String {
    "127.0.0.1:8081".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    MAX_FRAME_LEN
}
fn default_outbound_queue() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogicSection {
    /// gRPC endpoint of the logic service.
    #[serde(default = "default_logic_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_logic_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LogicSection {
    fn default() -> Self {
        Self {
            endpoint: default_logic_endpoint(),
            timeout_ms: default_logic_timeout_ms(),
        }
    }
}

impl LogicSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(GateError::BadRequest(
                "logic.endpoint must be an http(s) url".into(),
            ));
        }
        if !(100..=60000).contains(&self.timeout_ms) {
            return Err(GateError::BadRequest(
                "logic.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_logic_endpoint() -> String {
    "http://127.0.0.1:50000".into()
}
fn default_logic_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default)]
    pub store: StoreKind,

    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_token_ttl_months")]
    pub token_ttl_months: u32,

    /// Fixed verification code. Unset accepts any code (development only).
    #[serde(default)]
    pub verification_code: Option<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            redis_url: None,
            token_ttl_months: default_token_ttl_months(),
            verification_code: None,
        }
    }
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=24).contains(&self.token_ttl_months) {
            return Err(GateError::BadRequest(
                "auth.token_ttl_months must be between 1 and 24".into(),
            ));
        }
        if self.store == StoreKind::Redis && self.redis_url.is_none() {
            return Err(GateError::BadRequest(
                "auth.redis_url is required when auth.store is redis".into(),
            ));
        }
        Ok(())
    }
}

fn default_token_ttl_months() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    /// Answer unauthenticated or malformed frames with a status-only response
    /// instead of dropping them.
    #[serde(default)]
    pub reject_replies: bool,
}
