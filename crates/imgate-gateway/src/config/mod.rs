//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use imgate_core::error::{GateError, Result};

pub use schema::{
    AuthSection, DispatchSection, GatewayConfig, GatewaySection, LogicSection, StoreKind,
};

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| GateError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| GateError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
