//! Per-connection state owned by the connection task.

use bytes::Bytes;
use prost::Message as _;
use tokio::sync::mpsc::{self, error::TrySendError};

use imgate_core::error::{GateError, Result};
use imgate_core::protocol::envelope::Output;
use imgate_core::protocol::frame::MAX_FRAME_LEN;

/// Identity bound to a connection after a successful sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnSession {
    pub user_id: i64,
    pub device_id: i64,
}

/// Mutable per-connection record, injected into every dispatcher call.
///
/// `session` is `None` until sign-in succeeds; there is no way back to
/// `None` short of dropping the connection.
#[derive(Debug)]
pub struct ConnState {
    handle: i64,
    session: Option<ConnSession>,
}

impl ConnState {
    pub fn new(handle: i64) -> Self {
        Self {
            handle,
            session: None,
        }
    }

    /// Transport-level connection handle (registry key).
    pub fn handle(&self) -> i64 {
        self.handle
    }

    pub fn session(&self) -> Option<ConnSession> {
        self.session
    }

    /// Install or overwrite the session. Re-sign-in replaces, never merges.
    pub(crate) fn bind(&mut self, session: ConnSession) {
        self.session = Some(session);
    }
}

/// Outbound queue of one connection (encoded `Output` envelopes).
///
/// Carries the transport's frame limit: an envelope the writer could not
/// frame is refused here, while the caller can still answer the request.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<Bytes>,
    max_len: usize,
}

impl Outbound {
    pub fn new(tx: mpsc::Sender<Bytes>, max_len: usize) -> Self {
        Self {
            tx,
            max_len: max_len.min(MAX_FRAME_LEN),
        }
    }

    /// Bounded queue plus the receiver the transport writer drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        Self::bounded(capacity, MAX_FRAME_LEN)
    }

    /// Like `channel`, with an envelope size limit below the frame maximum.
    pub fn bounded(capacity: usize, max_len: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx, max_len), rx)
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Enqueue without waiting: the writer may live on the same task, so a
    /// full queue fails instead of blocking.
    pub fn send(&self, out: &Output) -> Result<()> {
        let len = out.encoded_len();
        if len > self.max_len {
            return Err(GateError::FrameTooLarge {
                len,
                max: self.max_len,
            });
        }
        let bytes = Bytes::from(out.encode_to_vec());
        self.tx.try_send(bytes).map_err(|e| match e {
            TrySendError::Full(_) => GateError::Internal("outbound queue full".into()),
            TrySendError::Closed(_) => GateError::Internal("connection closed".into()),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
