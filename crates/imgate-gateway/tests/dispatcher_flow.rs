//! Per-connection dispatch: sign-in gate, routing and response correlation.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use bytes::Bytes;
use prost::Message;
use tokio::sync::mpsc;

use imgate_core::error::{status, GateError};
use imgate_core::protocol::envelope::{
    ChatMessage, Input, MessageAckInput, Output, PackageType, SignInInput, SyncInput, SyncOutput,
};
use imgate_core::protocol::logic::{MessageAckReq, OfflineReq, SyncReq};
use imgate_gateway::backend::CallCtx;
use imgate_gateway::dispatch::{ConnSession, ConnState, DispatchOptions, Dispatcher, Outbound};

mod fake_backend;
use fake_backend::{Call, FakeBackend, Op};

const CONN_ADDR: &str = "10.0.0.5:8081";
const HANDLE: i64 = 11;

struct Harness {
    backend: Arc<FakeBackend>,
    dispatcher: Dispatcher,
    conn: ConnState,
    out: Outbound,
    rx: mpsc::Receiver<Bytes>,
}

impl Harness {
    fn new() -> Self {
        Self::with_options(DispatchOptions::default())
    }

    fn with_options(opts: DispatchOptions) -> Self {
        let backend = Arc::new(FakeBackend::new());
        let dispatcher = Dispatcher::new(backend.clone(), CONN_ADDR, opts);
        let (out, rx) = Outbound::channel(16);
        Self {
            backend,
            dispatcher,
            conn: ConnState::new(HANDLE),
            out,
            rx,
        }
    }

    async fn send(&mut self, frame: &[u8]) {
        self.dispatcher.on_frame(&mut self.conn, &self.out, frame).await;
    }

    async fn send_input(&mut self, pt: PackageType, request_id: i64, payload: Vec<u8>) {
        let input = Input {
            r#type: pt as i32,
            request_id,
            data: payload,
        };
        self.send(&input.encode_to_vec()).await;
    }

    async fn sign_in(&mut self, request_id: i64, user_id: i64, device_id: i64) {
        let payload = SignInInput {
            user_id,
            device_id,
            token: "tok".into(),
        };
        self.send_input(PackageType::SignIn, request_id, payload.encode_to_vec())
            .await;
    }

    fn next_output(&mut self) -> Option<Output> {
        self.rx
            .try_recv()
            .ok()
            .map(|b| Output::decode(b).expect("valid output"))
    }
}

#[tokio::test]
async fn sync_before_sign_in_is_dropped() {
    let mut h = Harness::new();
    h.send_input(PackageType::Sync, 1, SyncInput { seq: 0 }.encode_to_vec())
        .await;
    h.send_input(PackageType::Heartbeat, 2, Vec::new()).await;

    assert!(h.next_output().is_none());
    assert!(h.backend.calls().is_empty());
    assert!(h.conn.session().is_none());
}

#[tokio::test]
async fn sign_in_echoes_request_id_and_binds_session() {
    let mut h = Harness::new();
    h.sign_in(42, 7, 3).await;

    let out = h.next_output().expect("sign-in response");
    assert_eq!(out.r#type, PackageType::SignIn as i32);
    assert_eq!(out.request_id, 42);
    assert_eq!(out.code, 0);
    assert!(out.message.is_empty());
    assert!(out.data.is_empty());
    assert!(h.next_output().is_none());

    assert_eq!(
        h.conn.session(),
        Some(ConnSession {
            user_id: 7,
            device_id: 3
        })
    );

    match h.backend.calls().as_slice() {
        [Call::ConnSignIn(ctx, req)] => {
            assert_eq!(*ctx, CallCtx::new(42));
            assert_eq!((req.user_id, req.device_id), (7, 3));
            assert_eq!(req.token, "tok");
            assert_eq!(req.conn_addr, CONN_ADDR);
            assert_eq!(req.conn_fd, HANDLE);
        }
        other => panic!("unexpected calls: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_sign_in_reports_backend_status_and_binds_nothing() {
    let mut h = Harness::new();
    h.backend
        .fail(Op::ConnSignIn, GateError::backend(10_000, "token expired"));
    h.sign_in(5, 7, 3).await;

    let out = h.next_output().expect("sign-in response");
    assert_eq!(out.request_id, 5);
    assert_eq!(out.code, 10_000);
    assert_eq!(out.message, "token expired");
    assert!(h.conn.session().is_none());
}

#[tokio::test]
async fn failed_re_sign_in_keeps_existing_session() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    h.backend
        .fail(Op::ConnSignIn, GateError::backend(status::UNAUTHENTICATED, "nope"));
    h.sign_in(2, 8, 4).await;

    assert_eq!(h.next_output().unwrap().code, 0);
    assert_eq!(h.next_output().unwrap().code, status::UNAUTHENTICATED);
    assert_eq!(
        h.conn.session(),
        Some(ConnSession {
            user_id: 7,
            device_id: 3
        })
    );
}

#[tokio::test]
async fn re_sign_in_overwrites_session() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    h.sign_in(2, 8, 4).await;

    assert_eq!(
        h.conn.session(),
        Some(ConnSession {
            user_id: 8,
            device_id: 4
        })
    );

    h.send_input(PackageType::Sync, 3, SyncInput { seq: 9 }.encode_to_vec())
        .await;
    let last = h.backend.calls().pop().unwrap();
    assert_eq!(
        last,
        Call::Sync(
            CallCtx::new(3),
            SyncReq {
                user_id: 8,
                device_id: 4,
                seq: 9
            }
        )
    );
}

#[tokio::test]
async fn sync_returns_message_batch() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();

    let batch = vec![
        ChatMessage {
            seq: 10,
            message_content: b"hi".to_vec(),
            ..Default::default()
        },
        ChatMessage {
            seq: 11,
            ..Default::default()
        },
    ];
    h.backend.set_messages(batch.clone());
    h.send_input(PackageType::Sync, 77, SyncInput { seq: 9 }.encode_to_vec())
        .await;

    let out = h.next_output().expect("sync response");
    assert_eq!(out.r#type, PackageType::Sync as i32);
    assert_eq!(out.request_id, 77);
    assert_eq!(out.code, 0);
    let payload = SyncOutput::decode(out.data.as_slice()).unwrap();
    assert_eq!(payload.messages, batch);
}

#[tokio::test]
async fn sync_failure_carries_status_without_payload() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();

    h.backend
        .fail(Op::Sync, GateError::backend(status::UNAVAILABLE, "store down"));
    h.send_input(PackageType::Sync, 78, SyncInput { seq: 0 }.encode_to_vec())
        .await;

    let out = h.next_output().expect("sync response");
    assert_eq!(out.request_id, 78);
    assert_eq!(out.code, status::UNAVAILABLE);
    assert_eq!(out.message, "store down");
    assert!(out.data.is_empty());
}

#[tokio::test]
async fn oversized_sync_batch_is_cut_to_frame_limit() {
    let mut h = Harness::new();
    let (out, rx) = Outbound::bounded(16, 4096);
    h.out = out;
    h.rx = rx;
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();

    let batch: Vec<ChatMessage> = (0..20)
        .map(|seq| ChatMessage {
            seq,
            message_content: vec![b'x'; 500],
            ..Default::default()
        })
        .collect();
    h.backend.set_messages(batch.clone());
    h.send_input(PackageType::Sync, 40, SyncInput { seq: 0 }.encode_to_vec())
        .await;

    let raw = h.rx.try_recv().expect("sync response");
    assert!(raw.len() <= 4096);
    let out = Output::decode(raw).unwrap();
    assert_eq!(out.request_id, 40);
    assert_eq!(out.code, 0);

    let payload = SyncOutput::decode(out.data.as_slice()).unwrap();
    assert!(payload.has_more);
    assert!(!payload.messages.is_empty());
    assert!(payload.messages.len() < batch.len());
    assert_eq!(payload.messages[..], batch[..payload.messages.len()]);
}

#[tokio::test]
async fn unframeable_sync_answers_resource_exhausted() {
    let mut h = Harness::new();
    let (out, rx) = Outbound::bounded(16, 1024);
    h.out = out;
    h.rx = rx;
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();

    h.backend.set_messages(vec![ChatMessage {
        seq: 1,
        message_content: vec![b'x'; 2048],
        ..Default::default()
    }]);
    h.send_input(PackageType::Sync, 41, SyncInput { seq: 0 }.encode_to_vec())
        .await;

    let out = h.next_output().expect("status-only response");
    assert_eq!(out.r#type, PackageType::Sync as i32);
    assert_eq!(out.request_id, 41);
    assert_eq!(out.code, status::RESOURCE_EXHAUSTED);
    assert!(out.data.is_empty());
    assert!(h.next_output().is_none());
}

#[tokio::test]
async fn heartbeat_answers_without_backend_call() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();
    let before = h.backend.calls().len();

    h.send_input(PackageType::Heartbeat, 9, Vec::new()).await;

    let out = h.next_output().expect("heartbeat response");
    assert_eq!(out.r#type, PackageType::Heartbeat as i32);
    assert_eq!(out.request_id, 9);
    assert_eq!(out.code, 0);
    assert!(out.data.is_empty());
    assert_eq!(h.backend.calls().len(), before);
}

#[derive(Clone, Default)]
struct LogSink(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "current_thread")]
async fn heartbeat_log_carries_connection() {
    let sink = LogSink::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    h.send_input(PackageType::Heartbeat, 2, Vec::new()).await;

    let logs = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    let line = logs
        .lines()
        .find(|l| l.contains("heartbeat"))
        .expect("heartbeat logged");
    assert!(line.contains(&format!("conn={HANDLE}")), "{line}");
    assert!(line.contains("user_id=7"), "{line}");
}

#[tokio::test]
async fn message_ack_never_answers() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();

    let ack = MessageAckInput {
        device_ack: 100,
        receive_time: 1_700_000_000_000,
    };
    h.send_input(PackageType::MessageAck, 20, ack.encode_to_vec())
        .await;
    assert!(h.next_output().is_none());

    h.backend
        .fail(Op::MessageAck, GateError::backend(status::INTERNAL, "boom"));
    h.send_input(PackageType::MessageAck, 21, ack.encode_to_vec())
        .await;
    assert!(h.next_output().is_none());

    let acks: Vec<_> = h
        .backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::MessageAck(..)))
        .collect();
    assert_eq!(
        acks[0],
        Call::MessageAck(
            CallCtx::new(20),
            MessageAckReq {
                user_id: 7,
                device_id: 3,
                device_ack: 100,
                receive_time: 1_700_000_000_000
            }
        )
    );
    assert_eq!(acks.len(), 2);
}

#[tokio::test]
async fn malformed_frame_keeps_session_and_sends_nothing() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();

    h.send(&[0xff, 0xff, 0xff, 0xff]).await;
    // Valid envelope, garbage payload.
    h.send_input(PackageType::Sync, 2, vec![0xff, 0xff]).await;

    assert!(h.next_output().is_none());
    assert_eq!(
        h.conn.session(),
        Some(ConnSession {
            user_id: 7,
            device_id: 3
        })
    );

    h.send_input(PackageType::Heartbeat, 3, Vec::new()).await;
    assert_eq!(h.next_output().unwrap().request_id, 3);
}

#[tokio::test]
async fn unknown_type_is_dropped_after_sign_in() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();
    let before = h.backend.calls().len();

    let input = Input {
        r#type: 99,
        request_id: 4,
        data: Vec::new(),
    };
    h.send(&input.encode_to_vec()).await;

    assert!(h.next_output().is_none());
    assert_eq!(h.backend.calls().len(), before);
}

#[tokio::test]
async fn close_notifies_offline_once_even_on_failure() {
    let mut h = Harness::new();
    h.sign_in(1, 7, 3).await;
    h.backend
        .fail(Op::Offline, GateError::backend(status::UNAVAILABLE, "gone"));

    h.dispatcher.on_close(&h.conn).await;

    let offline: Vec<_> = h
        .backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Offline(..)))
        .collect();
    assert_eq!(
        offline,
        vec![Call::Offline(
            CallCtx::default(),
            OfflineReq {
                user_id: 7,
                device_id: 3
            }
        )]
    );
}

#[tokio::test]
async fn close_before_sign_in_calls_nothing() {
    let h = Harness::new();
    h.dispatcher.on_close(&h.conn).await;
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn reject_replies_answers_unauthenticated_and_malformed_frames() {
    let mut h = Harness::with_options(DispatchOptions {
        reject_replies: true,
    });

    h.send_input(PackageType::Sync, 31, SyncInput { seq: 0 }.encode_to_vec())
        .await;
    let out = h.next_output().expect("rejection");
    assert_eq!(out.r#type, PackageType::Sync as i32);
    assert_eq!(out.request_id, 31);
    assert_eq!(out.code, status::UNAUTHENTICATED);

    h.send_input(PackageType::SignIn, 32, vec![0xff]).await;
    let out = h.next_output().expect("rejection");
    assert_eq!(out.request_id, 32);
    assert_eq!(out.code, status::INVALID_ARGUMENT);
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn reject_replies_still_never_answers_acks() {
    let mut h = Harness::with_options(DispatchOptions {
        reject_replies: true,
    });
    h.sign_in(1, 7, 3).await;
    let _ = h.next_output();

    h.send_input(PackageType::MessageAck, 2, vec![0xff]).await;
    assert!(h.next_output().is_none());
}

#[tokio::test]
async fn closed_outbound_does_not_disturb_dispatch() {
    let mut h = Harness::new();
    let (out, rx) = Outbound::channel(1);
    drop(rx);
    h.out = out;

    h.sign_in(1, 7, 3).await;
    assert_eq!(
        h.conn.session(),
        Some(ConnSession {
            user_id: 7,
            device_id: 3
        })
    );
}
