//! Logic-service RPC messages (`pb.LogicInt`).
//!
//! The gateway only consumes these; the service owns their semantics.

use super::envelope::{ChatMessage, MessageSend};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnSignInReq {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(int64, tag = "2")]
    pub device_id: i64,
    #[prost(string, tag = "3")]
    pub token: String,
    /// Address of the gateway holding the connection.
    #[prost(string, tag = "4")]
    pub conn_addr: String,
    /// Gateway-local connection handle; pushes are routed back to it.
    #[prost(int64, tag = "5")]
    pub conn_fd: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnSignInResp {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDeviceReq {
    #[prost(int64, tag = "1")]
    pub device_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDeviceResp {
    #[prost(message, optional, tag = "1")]
    pub device: Option<Device>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Device {
    #[prost(int64, tag = "1")]
    pub device_id: i64,
    #[prost(int64, tag = "2")]
    pub user_id: i64,
    /// Platform kind (android, ios, web...), opaque to the gateway.
    #[prost(int32, tag = "3")]
    pub r#type: i32,
    #[prost(string, tag = "4")]
    pub brand: String,
    #[prost(string, tag = "5")]
    pub model: String,
    #[prost(string, tag = "6")]
    pub system_version: String,
    #[prost(string, tag = "7")]
    pub sdk_version: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncReq {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(int64, tag = "2")]
    pub device_id: i64,
    #[prost(int64, tag = "3")]
    pub seq: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncResp {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<ChatMessage>,
    #[prost(bool, tag = "2")]
    pub has_more: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageAckReq {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(int64, tag = "2")]
    pub device_id: i64,
    #[prost(int64, tag = "3")]
    pub device_ack: i64,
    #[prost(int64, tag = "4")]
    pub receive_time: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageAckResp {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OfflineReq {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(int64, tag = "2")]
    pub device_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OfflineResp {}

/// Push request the logic service sends to the gateway owning `conn_fd`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeliverMessageReq {
    #[prost(int64, tag = "1")]
    pub conn_fd: i64,
    #[prost(int64, tag = "2")]
    pub request_id: i64,
    #[prost(message, optional, tag = "3")]
    pub message_send: Option<MessageSend>,
}
