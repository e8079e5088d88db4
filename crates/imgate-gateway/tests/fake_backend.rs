//! Recording logic-service fake shared by gateway tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use imgate_core::error::{GateError, Result};
use imgate_core::protocol::envelope::ChatMessage;
use imgate_core::protocol::logic::{
    ConnSignInReq, Device, MessageAckReq, OfflineReq, SyncReq, SyncResp,
};
use imgate_gateway::backend::{CallCtx, LogicBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ConnSignIn,
    GetDevice,
    Sync,
    MessageAck,
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ConnSignIn(CallCtx, ConnSignInReq),
    GetDevice(CallCtx, i64),
    Sync(CallCtx, SyncReq),
    MessageAck(CallCtx, MessageAckReq),
    Offline(CallCtx, OfflineReq),
}

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Op, GateError>>,
    messages: Mutex<Vec<ChatMessage>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call to `op` fail with `err`.
    pub fn fail(&self, op: Op, err: GateError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub fn succeed(&self, op: Op) {
        self.failures.lock().unwrap().remove(&op);
    }

    pub fn set_messages(&self, messages: Vec<ChatMessage>) {
        *self.messages.lock().unwrap() = messages;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: Op, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(&op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LogicBackend for FakeBackend {
    async fn conn_sign_in(&self, ctx: CallCtx, req: ConnSignInReq) -> Result<()> {
        self.record(Op::ConnSignIn, Call::ConnSignIn(ctx, req))
    }

    async fn get_device(&self, ctx: CallCtx, device_id: i64) -> Result<Device> {
        self.record(Op::GetDevice, Call::GetDevice(ctx, device_id))?;
        Ok(Device {
            device_id,
            r#type: 2,
            brand: "acme".into(),
            ..Default::default()
        })
    }

    async fn sync(&self, ctx: CallCtx, req: SyncReq) -> Result<SyncResp> {
        self.record(Op::Sync, Call::Sync(ctx, req))?;
        Ok(SyncResp {
            messages: self.messages.lock().unwrap().clone(),
            has_more: false,
        })
    }

    async fn message_ack(&self, ctx: CallCtx, req: MessageAckReq) -> Result<()> {
        self.record(Op::MessageAck, Call::MessageAck(ctx, req))
    }

    async fn offline(&self, ctx: CallCtx, req: OfflineReq) -> Result<()> {
        self.record(Op::Offline, Call::Offline(ctx, req))
    }
}
