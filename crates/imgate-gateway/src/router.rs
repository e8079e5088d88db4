//! Axum router wiring.
//!
//! - `/v1/ws`: WebSocket upgrade for client connections
//! - `/v1/auth/*`: token issuance and verification
//! - `/internal/deliver`, `/healthz`: see `ops`

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, auth, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ws", get(transport::ws::ws_upgrade))
        .route("/v1/auth/sign_in", post(auth::api::sign_in))
        .route("/v1/auth/verify", post(auth::api::verify))
        .route("/internal/deliver", post(ops::deliver))
        .route("/healthz", get(ops::healthz))
        .with_state(state)
}
