use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use prost::Message as _;

use imgate_core::error::{GateError, Result};
use imgate_core::protocol::envelope::{MessageSend, Output, PackageType};

use crate::dispatch::Outbound;

/// Live connections of this gateway instance:
/// - `handle -> Outbound`
///
/// Handles are allocated here and announced to the logic service on sign-in
/// (`conn_fd`), which uses them to address pushes.
pub struct ConnRegistry {
    conns: DashMap<i64, Outbound>,
    seq: AtomicI64,
}

impl Default for ConnRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnRegistry {
    pub fn new() -> Self {
        Self {
            conns: DashMap::new(),
            seq: AtomicI64::new(1),
        }
    }

    /// Register a connection's outbound queue and return its handle.
    pub fn register(&self, out: Outbound) -> i64 {
        let handle = self.seq.fetch_add(1, Ordering::Relaxed);
        self.conns.insert(handle, out);
        handle
    }

    pub fn remove(&self, handle: i64) -> Option<Outbound> {
        self.conns.remove(&handle).map(|(_, out)| out)
    }

    pub fn get(&self, handle: i64) -> Option<Outbound> {
        self.conns.get(&handle).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// Push one message to the connection behind `handle`.
    pub fn deliver(&self, handle: i64, request_id: i64, msg: &MessageSend) -> Result<()> {
        let out = self
            .get(handle)
            .ok_or_else(|| GateError::BadRequest(format!("connection not found: {handle}")))?;
        let output = Output::ok(PackageType::Message, request_id, Some(msg.encode_to_vec()));
        out.send(&output)
    }
}
