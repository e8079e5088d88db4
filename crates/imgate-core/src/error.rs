//! Shared error type across imgate crates.

use thiserror::Error;

/// Client-facing error codes (stable API, used on the HTTP surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Malformed envelope, frame or request body.
    BadRequest,
    /// Operation attempted before sign-in.
    Unauthenticated,
    /// Verification code rejected.
    InvalidCode,
    /// Token/session missing or expired.
    Unauthorized,
    /// Backing store unavailable or failed.
    Storage,
    /// Logic service returned an error.
    Backend,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Unauthenticated => "UNAUTHENTICATED",
            ClientCode::InvalidCode => "INVALID_CODE",
            ClientCode::Unauthorized => "UNAUTHORIZED",
            ClientCode::Storage => "STORAGE",
            ClientCode::Backend => "BACKEND",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// gRPC status numbers used for locally raised errors.
pub mod status {
    pub const OK: i32 = 0;
    pub const INVALID_ARGUMENT: i32 = 3;
    pub const NOT_FOUND: i32 = 5;
    pub const RESOURCE_EXHAUSTED: i32 = 8;
    pub const INTERNAL: i32 = 13;
    pub const UNAVAILABLE: i32 = 14;
    pub const UNAUTHENTICATED: i32 = 16;
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GateError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("frame too large: {len} > {max}")]
    FrameTooLarge { len: usize, max: usize },
    #[error("not signed in")]
    Unauthenticated,
    #[error("invalid verification code")]
    InvalidCode,
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage: {0}")]
    Storage(String),
    #[error("{message}")]
    Backend { code: i32, message: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl GateError {
    /// Wrap a logic-service status.
    pub fn backend(code: i32, message: impl Into<String>) -> Self {
        GateError::Backend {
            code,
            message: message.into(),
        }
    }

    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            GateError::Decode(_) | GateError::FrameTooLarge { .. } | GateError::BadRequest(_) => {
                ClientCode::BadRequest
            }
            GateError::Unauthenticated => ClientCode::Unauthenticated,
            GateError::InvalidCode => ClientCode::InvalidCode,
            GateError::Unauthorized => ClientCode::Unauthorized,
            GateError::Storage(_) => ClientCode::Storage,
            GateError::Backend { .. } => ClientCode::Backend,
            GateError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Numeric status written into `Output.code`.
    ///
    /// Backend codes pass through untouched so clients see exactly what the
    /// logic service answered.
    pub fn status_code(&self) -> i32 {
        match self {
            GateError::Backend { code, .. } => *code,
            GateError::Decode(_) | GateError::BadRequest(_) | GateError::InvalidCode => {
                status::INVALID_ARGUMENT
            }
            GateError::FrameTooLarge { .. } => status::RESOURCE_EXHAUSTED,
            GateError::Unauthenticated | GateError::Unauthorized => status::UNAUTHENTICATED,
            GateError::Storage(_) => status::UNAVAILABLE,
            GateError::Internal(_) => status::INTERNAL,
        }
    }

    /// Human-readable status written into `Output.message`.
    pub fn status_message(&self) -> String {
        match self {
            GateError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<prost::DecodeError> for GateError {
    fn from(e: prost::DecodeError) -> Self {
        GateError::Decode(e.to_string())
    }
}
