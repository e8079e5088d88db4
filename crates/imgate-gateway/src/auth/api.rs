//! HTTP surface for sign-in and token verification.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use imgate_core::error::GateError;

use crate::app_state::AppState;
use crate::backend::CallCtx;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInBody {
    pub phone_number: String,
    pub code: String,
    pub device_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInReply {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyBody {
    pub user_id: i64,
    pub device_id: i64,
    pub token: String,
}

pub async fn sign_in(
    State(app): State<AppState>,
    Json(body): Json<SignInBody>,
) -> Result<Json<SignInReply>, ApiError> {
    let grant = app
        .auth()
        .sign_in(CallCtx::default(), &body.phone_number, &body.code, body.device_id)
        .await?;
    Ok(Json(SignInReply {
        user_id: grant.user_id,
        token: grant.token,
    }))
}

pub async fn verify(
    State(app): State<AppState>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.auth()
        .verify(body.user_id, body.device_id, &body.token)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// `GateError` rendered as a JSON HTTP response.
#[derive(Debug)]
pub struct ApiError(pub GateError);

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GateError::Decode(_) | GateError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GateError::FrameTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GateError::InvalidCode | GateError::Unauthorized | GateError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            GateError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            GateError::Backend { .. } => StatusCode::BAD_GATEWAY,
            GateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
