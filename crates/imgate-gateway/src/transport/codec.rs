//! Decode-once mapping from WebSocket messages to gateway input.
//!
//! - Binary frames => one envelope each (decoded by the dispatcher)
//! - Text frames are not part of the protocol and are only measured
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use bytes::Bytes;

#[derive(Debug)]
pub enum Inbound {
    Frame(Bytes),
    Text { bytes_len: usize },
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(msg: Message) -> Inbound {
    match msg {
        Message::Binary(b) => Inbound::Frame(Bytes::from(b)),
        Message::Text(s) => Inbound::Text {
            bytes_len: s.len(),
        },
        Message::Ping(v) => Inbound::Ping(v),
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    }
}
