//! Operational and internal HTTP endpoints.
//!
//! - `/healthz`           : liveness
//! - `/internal/deliver`  : logic service -> connection push (protobuf body)

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use prost::Message as _;
use tracing::debug;

use imgate_core::error::GateError;
use imgate_core::protocol::logic::DeliverMessageReq;

use crate::app_state::AppState;
use crate::auth::api::ApiError;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn deliver(State(app): State<AppState>, body: Bytes) -> Response {
    let req = match DeliverMessageReq::decode(body) {
        Ok(req) => req,
        Err(e) => return ApiError(GateError::from(e)).into_response(),
    };

    let registry = app.registry();
    if registry.get(req.conn_fd).is_none() {
        debug!(conn = req.conn_fd, "push for unknown connection");
        return (StatusCode::NOT_FOUND, "connection not found").into_response();
    }

    let msg = req.message_send.unwrap_or_default();
    match registry.deliver(req.conn_fd, req.request_id, &msg) {
        Ok(()) => (StatusCode::OK, "delivered").into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
