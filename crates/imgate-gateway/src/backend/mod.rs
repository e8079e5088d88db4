//! Logic-service call contract.
//!
//! The dispatcher and authentication only see `LogicBackend`; the gRPC client
//! is one implementation and tests substitute in-memory fakes.

mod grpc;

use async_trait::async_trait;

use imgate_core::error::Result;
use imgate_core::protocol::logic::{
    ConnSignInReq, Device, MessageAckReq, OfflineReq, SyncReq, SyncResp,
};

pub use grpc::GrpcLogicBackend;

/// Per-call context forwarded to the logic service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCtx {
    /// Client request id, propagated for tracing. 0 for gateway-initiated calls.
    pub request_id: i64,
}

impl CallCtx {
    pub fn new(request_id: i64) -> Self {
        Self { request_id }
    }
}

/// Operations the gateway consumes from the logic service.
///
/// Errors come back as `GateError::Backend { code, message }` carrying the
/// service's status verbatim.
#[async_trait]
pub trait LogicBackend: Send + Sync {
    /// Bind (user, device) to this gateway's connection after validating the token.
    async fn conn_sign_in(&self, ctx: CallCtx, req: ConnSignInReq) -> Result<()>;
    async fn get_device(&self, ctx: CallCtx, device_id: i64) -> Result<Device>;
    async fn sync(&self, ctx: CallCtx, req: SyncReq) -> Result<SyncResp>;
    async fn message_ack(&self, ctx: CallCtx, req: MessageAckReq) -> Result<()>;
    async fn offline(&self, ctx: CallCtx, req: OfflineReq) -> Result<()>;
}
