use std::sync::Arc;

use prost::Message as _;
use tracing::{debug, info, warn};

use imgate_core::error::GateError;
use imgate_core::protocol::envelope::{
    Input, MessageAckInput, Output, PackageType, SignInInput, SyncInput, SyncOutput,
};
use imgate_core::protocol::logic::{ConnSignInReq, MessageAckReq, OfflineReq, SyncReq};

use crate::backend::{CallCtx, LogicBackend};
use crate::dispatch::conn::{ConnSession, ConnState, Outbound};

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Reply to unauthenticated or undecodable frames with a status-only
    /// `Output` instead of dropping them silently.
    pub reject_replies: bool,
}

/// Per-frame state machine shared by every connection.
///
/// Holds no per-connection data: callers pass the connection's `ConnState`
/// and `Outbound`, and must not call it concurrently for the same connection.
pub struct Dispatcher {
    backend: Arc<dyn LogicBackend>,
    conn_addr: Arc<str>,
    opts: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn LogicBackend>,
        conn_addr: impl Into<Arc<str>>,
        opts: DispatchOptions,
    ) -> Self {
        Self {
            backend,
            conn_addr: conn_addr.into(),
            opts,
        }
    }

    pub fn conn_addr(&self) -> &str {
        &self.conn_addr
    }

    /// Handle one inbound frame. Never fails: every error is logged and, at
    /// most, answered on `out`.
    pub async fn on_frame(&self, conn: &mut ConnState, out: &Outbound, frame: &[u8]) {
        let input = match Input::from_frame(frame) {
            Ok(input) => input,
            Err(e) => {
                warn!(conn = conn.handle(), error = %e, "dropping undecodable envelope");
                self.reject(conn, out, PackageType::Unknown, 0, &e);
                return;
            }
        };

        let pt = input.package_type();
        if pt == Ok(PackageType::SignIn) {
            self.sign_in(conn, out, &input).await;
            return;
        }

        let Some(session) = conn.session() else {
            debug!(conn = conn.handle(), package_type = input.r#type, "dropping frame before sign-in");
            let pt = pt.unwrap_or(PackageType::Unknown);
            self.reject(conn, out, pt, input.request_id, &GateError::Unauthenticated);
            return;
        };

        match pt {
            Ok(PackageType::Sync) => self.sync(conn, session, out, &input).await,
            Ok(PackageType::Heartbeat) => self.heartbeat(conn, session, out, &input),
            Ok(PackageType::MessageAck) => self.message_ack(conn, session, out, &input).await,
            Ok(other) => {
                warn!(conn = conn.handle(), package_type = ?other, "unexpected package type from client");
            }
            Err(e) => {
                warn!(conn = conn.handle(), error = %e, "dropping frame");
            }
        }
    }

    /// Best-effort offline notification once the transport is gone.
    pub async fn on_close(&self, conn: &ConnState) {
        let Some(session) = conn.session() else {
            debug!(conn = conn.handle(), "closed before sign-in");
            return;
        };

        let req = OfflineReq {
            user_id: session.user_id,
            device_id: session.device_id,
        };
        match self.backend.offline(CallCtx::default(), req).await {
            Ok(()) => debug!(
                conn = conn.handle(),
                user_id = session.user_id,
                device_id = session.device_id,
                "offline"
            ),
            Err(e) => warn!(
                conn = conn.handle(),
                user_id = session.user_id,
                device_id = session.device_id,
                error = %e,
                "offline notification failed"
            ),
        }
    }

    async fn sign_in(&self, conn: &mut ConnState, out: &Outbound, input: &Input) {
        let Some(req) = self.payload::<SignInInput>(conn, out, input, PackageType::SignIn) else {
            return;
        };

        let res = self
            .backend
            .conn_sign_in(
                CallCtx::new(input.request_id),
                ConnSignInReq {
                    user_id: req.user_id,
                    device_id: req.device_id,
                    token: req.token,
                    conn_addr: self.conn_addr.to_string(),
                    conn_fd: conn.handle(),
                },
            )
            .await;

        self.reply(conn, out, PackageType::SignIn, input.request_id, res.as_ref().err(), None);

        match res {
            Ok(()) => {
                conn.bind(ConnSession {
                    user_id: req.user_id,
                    device_id: req.device_id,
                });
                info!(
                    conn = conn.handle(),
                    user_id = req.user_id,
                    device_id = req.device_id,
                    "signed in"
                );
            }
            Err(e) => {
                warn!(
                    conn = conn.handle(),
                    user_id = req.user_id,
                    device_id = req.device_id,
                    error = %e,
                    "sign-in rejected"
                );
            }
        }
    }

    async fn sync(&self, conn: &ConnState, session: ConnSession, out: &Outbound, input: &Input) {
        let Some(req) = self.payload::<SyncInput>(conn, out, input, PackageType::Sync) else {
            return;
        };

        let res = self
            .backend
            .sync(
                CallCtx::new(input.request_id),
                SyncReq {
                    user_id: session.user_id,
                    device_id: session.device_id,
                    seq: req.seq,
                },
            )
            .await;

        match res {
            Ok(resp) => {
                let mut payload = SyncOutput {
                    messages: resp.messages,
                    has_more: resp.has_more,
                };
                let total = payload.messages.len();
                fit_sync_batch(&mut payload, input.request_id, out.max_len());
                if payload.messages.len() < total {
                    debug!(
                        conn = conn.handle(),
                        request_id = input.request_id,
                        kept = payload.messages.len(),
                        total,
                        "sync batch cut to frame limit"
                    );
                }
                self.reply(
                    conn,
                    out,
                    PackageType::Sync,
                    input.request_id,
                    None,
                    Some(payload.encode_to_vec()),
                );
            }
            Err(e) => {
                warn!(conn = conn.handle(), request_id = input.request_id, error = %e, "sync failed");
                self.reply(conn, out, PackageType::Sync, input.request_id, Some(&e), None);
            }
        }
    }

    fn heartbeat(&self, conn: &ConnState, session: ConnSession, out: &Outbound, input: &Input) {
        self.reply(conn, out, PackageType::Heartbeat, input.request_id, None, None);
        info!(
            conn = conn.handle(),
            user_id = session.user_id,
            device_id = session.device_id,
            "heartbeat"
        );
    }

    async fn message_ack(&self, conn: &ConnState, session: ConnSession, out: &Outbound, input: &Input) {
        let Some(ack) = self.payload::<MessageAckInput>(conn, out, input, PackageType::MessageAck)
        else {
            return;
        };

        let res = self
            .backend
            .message_ack(
                CallCtx::new(input.request_id),
                MessageAckReq {
                    user_id: session.user_id,
                    device_id: session.device_id,
                    device_ack: ack.device_ack,
                    receive_time: ack.receive_time,
                },
            )
            .await;

        if let Err(e) = res {
            warn!(
                conn = conn.handle(),
                user_id = session.user_id,
                device_id = session.device_id,
                device_ack = ack.device_ack,
                error = %e,
                "message ack failed"
            );
        }
    }

    fn payload<M: prost::Message + Default>(
        &self,
        conn: &ConnState,
        out: &Outbound,
        input: &Input,
        pt: PackageType,
    ) -> Option<M> {
        match input.payload::<M>() {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(
                    conn = conn.handle(),
                    package_type = ?pt,
                    request_id = input.request_id,
                    error = %e,
                    "dropping frame with bad payload"
                );
                self.reject(conn, out, pt, input.request_id, &e);
                None
            }
        }
    }

    fn reject(&self, conn: &ConnState, out: &Outbound, pt: PackageType, request_id: i64, err: &GateError) {
        // Acks are fire-and-forget even when rejections are answered.
        if self.opts.reject_replies && pt != PackageType::MessageAck {
            self.reply(conn, out, pt, request_id, Some(err), None);
        }
    }

    fn reply(
        &self,
        conn: &ConnState,
        out: &Outbound,
        pt: PackageType,
        request_id: i64,
        err: Option<&GateError>,
        payload: Option<Vec<u8>>,
    ) {
        let output = match err {
            Some(e) => Output::err(pt, request_id, e),
            None => Output::ok(pt, request_id, payload),
        };
        match out.send(&output) {
            Ok(()) => {}
            // Too big to frame: the request still gets its status-only answer.
            Err(e @ GateError::FrameTooLarge { .. }) if err.is_none() => {
                warn!(conn = conn.handle(), request_id, error = %e, "response too large");
                if let Err(e) = out.send(&Output::err(pt, request_id, &e)) {
                    warn!(conn = conn.handle(), request_id, error = %e, "response not sent");
                }
            }
            Err(e) => {
                warn!(conn = conn.handle(), request_id, error = %e, "response not sent");
            }
        }
    }
}

/// Drop trailing messages until the SYNC response fits in `max_len`, and
/// flag the cut with `has_more`. Keeps at least one message; a single
/// oversized message is left to the status-only fallback in `reply`.
fn fit_sync_batch(payload: &mut SyncOutput, request_id: i64, max_len: usize) {
    let envelope_len = |p: &SyncOutput| {
        Output::ok(PackageType::Sync, request_id, Some(p.encode_to_vec())).encoded_len()
    };
    if envelope_len(payload) <= max_len {
        return;
    }

    payload.has_more = true;
    // Upper bound: the `data` length prefix only shrinks as messages go.
    let mut len = envelope_len(payload);
    while payload.messages.len() > 1 && len > max_len {
        if let Some(last) = payload.messages.pop() {
            len = len.saturating_sub(prost::encoding::message::encoded_len(1, &last));
        }
    }
}
