use std::time::Duration;

use async_trait::async_trait;
use http::uri::PathAndQuery;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{Channel, Endpoint};

use imgate_core::error::{status, GateError, Result};
use imgate_core::protocol::logic::{
    ConnSignInReq, ConnSignInResp, Device, GetDeviceReq, GetDeviceResp, MessageAckReq,
    MessageAckResp, OfflineReq, OfflineResp, SyncReq, SyncResp,
};

use super::{CallCtx, LogicBackend};

const CONN_SIGN_IN: &str = "/pb.LogicInt/ConnSignIn";
const GET_DEVICE: &str = "/pb.LogicInt/GetDevice";
const SYNC: &str = "/pb.LogicInt/Sync";
const MESSAGE_ACK: &str = "/pb.LogicInt/MessageACK";
const OFFLINE: &str = "/pb.LogicInt/Offline";

/// `pb.LogicInt` client over a lazily connected tonic channel.
#[derive(Clone)]
pub struct GrpcLogicBackend {
    inner: Grpc<Channel>,
}

impl GrpcLogicBackend {
    /// Build the client without dialing; the first call connects.
    pub fn connect_lazy(endpoint: &str, timeout: Duration) -> Result<Self> {
        let channel = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| GateError::BadRequest(format!("invalid logic endpoint: {e}")))?
            .timeout(timeout)
            .connect_lazy();
        Ok(Self {
            inner: Grpc::new(channel),
        })
    }

    async fn unary<Req, Resp>(&self, ctx: CallCtx, path: &'static str, req: Req) -> Result<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.inner.clone();
        grpc.ready().await.map_err(|e| {
            GateError::backend(status::UNAVAILABLE, format!("logic service not ready: {e}"))
        })?;

        let mut request = tonic::Request::new(req);
        if let Ok(v) = ctx.request_id.to_string().parse::<AsciiMetadataValue>() {
            request.metadata_mut().insert("request_id", v);
        }

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let resp = grpc
            .unary(request, PathAndQuery::from_static(path), codec)
            .await
            .map_err(status_to_error)?;
        Ok(resp.into_inner())
    }
}

fn status_to_error(s: tonic::Status) -> GateError {
    GateError::backend(s.code() as i32, s.message())
}

fn device_or_not_found(resp: GetDeviceResp) -> Result<Device> {
    resp.device
        .ok_or_else(|| GateError::backend(status::NOT_FOUND, "device not found"))
}

#[async_trait]
impl LogicBackend for GrpcLogicBackend {
    async fn conn_sign_in(&self, ctx: CallCtx, req: ConnSignInReq) -> Result<()> {
        let _: ConnSignInResp = self.unary(ctx, CONN_SIGN_IN, req).await?;
        Ok(())
    }

    async fn get_device(&self, ctx: CallCtx, device_id: i64) -> Result<Device> {
        let resp: GetDeviceResp = self
            .unary(ctx, GET_DEVICE, GetDeviceReq { device_id })
            .await?;
        device_or_not_found(resp)
    }

    async fn sync(&self, ctx: CallCtx, req: SyncReq) -> Result<SyncResp> {
        self.unary(ctx, SYNC, req).await
    }

    async fn message_ack(&self, ctx: CallCtx, req: MessageAckReq) -> Result<()> {
        let _: MessageAckResp = self.unary(ctx, MESSAGE_ACK, req).await?;
        Ok(())
    }

    async fn offline(&self, ctx: CallCtx, req: OfflineReq) -> Result<()> {
        let _: OfflineResp = self.unary(ctx, OFFLINE, req).await?;
        Ok(())
    }
}
