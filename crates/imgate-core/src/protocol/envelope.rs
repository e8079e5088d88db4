//! Client envelope schema (protobuf via `prost` derive).
//!
//! `Input` travels client -> gateway, `Output` gateway -> client. Both wrap a
//! type-specific sub-message in `data`; that payload is only trusted after it
//! decodes successfully.

use prost::Message as _;

use crate::error::{GateError, Result};

/// Kind of envelope. Responses mirror the type of their request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PackageType {
    Unknown = 0,
    SignIn = 1,
    Sync = 2,
    Heartbeat = 3,
    /// Client receipt for delivered messages. Never answered.
    MessageAck = 4,
    /// Server push of a single message.
    Message = 5,
}

/// Inbound envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Input {
    #[prost(enumeration = "PackageType", tag = "1")]
    pub r#type: i32,
    /// Client-chosen correlation id, echoed in the response.
    #[prost(int64, tag = "2")]
    pub request_id: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub data: Vec<u8>,
}

/// Outbound envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Output {
    #[prost(enumeration = "PackageType", tag = "1")]
    pub r#type: i32,
    #[prost(int64, tag = "2")]
    pub request_id: i64,
    /// 0 on success.
    #[prost(int32, tag = "3")]
    pub code: i32,
    #[prost(string, tag = "4")]
    pub message: String,
    #[prost(bytes = "vec", tag = "5")]
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignInInput {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(int64, tag = "2")]
    pub device_id: i64,
    #[prost(string, tag = "3")]
    pub token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncInput {
    /// Sequence cursor: the last seq the device has already seen.
    #[prost(int64, tag = "1")]
    pub seq: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncOutput {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<ChatMessage>,
    #[prost(bool, tag = "2")]
    pub has_more: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageAckInput {
    /// Highest seq the device has received.
    #[prost(int64, tag = "1")]
    pub device_ack: i64,
    /// Unix milliseconds at which the client received it.
    #[prost(int64, tag = "2")]
    pub receive_time: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageSend {
    #[prost(message, optional, tag = "1")]
    pub message: Option<ChatMessage>,
}

/// A stored chat message as returned by sync and push.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChatMessage {
    #[prost(int32, tag = "1")]
    pub sender_type: i32,
    #[prost(int64, tag = "2")]
    pub sender_id: i64,
    #[prost(int64, tag = "3")]
    pub sender_device_id: i64,
    #[prost(int32, tag = "4")]
    pub receiver_type: i32,
    #[prost(int64, tag = "5")]
    pub receiver_id: i64,
    #[prost(int64, repeated, tag = "6")]
    pub to_user_ids: Vec<i64>,
    #[prost(int32, tag = "7")]
    pub message_type: i32,
    #[prost(bytes = "vec", tag = "8")]
    pub message_content: Vec<u8>,
    #[prost(int64, tag = "9")]
    pub seq: i64,
    #[prost(int64, tag = "10")]
    pub send_time: i64,
    #[prost(int32, tag = "11")]
    pub status: i32,
}

impl Input {
    /// Decode an inbound envelope from one frame.
    pub fn from_frame(buf: &[u8]) -> Result<Self> {
        Ok(Input::decode(buf)?)
    }

    /// Resolve the package type; unknown values are an error, not `Unknown`.
    pub fn package_type(&self) -> Result<PackageType> {
        PackageType::try_from(self.r#type)
            .map_err(|_| GateError::Decode(format!("unknown package type: {}", self.r#type)))
    }

    /// Decode the typed payload carried in `data`.
    pub fn payload<M: prost::Message + Default>(&self) -> Result<M> {
        Ok(M::decode(self.data.as_slice())?)
    }
}

impl Output {
    /// Success response for `request_id` with an optional payload.
    pub fn ok(pt: PackageType, request_id: i64, payload: Option<Vec<u8>>) -> Self {
        Output {
            r#type: pt as i32,
            request_id,
            code: 0,
            message: String::new(),
            data: payload.unwrap_or_default(),
        }
    }

    /// Error response for `request_id`; never carries a payload.
    pub fn err(pt: PackageType, request_id: i64, err: &GateError) -> Self {
        Output {
            r#type: pt as i32,
            request_id,
            code: err.status_code(),
            message: err.status_message(),
            data: Vec::new(),
        }
    }
}
