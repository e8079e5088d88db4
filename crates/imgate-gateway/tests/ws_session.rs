//! End-to-end over the WebSocket endpoint.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use prost::Message as _;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use imgate_core::protocol::envelope::{Input, Output, PackageType, SignInInput};
use imgate_gateway::app_state::AppState;
use imgate_gateway::auth::{AcceptAnyCode, InMemorySessionStore, InMemoryUserStore};
use imgate_gateway::{config, router};

mod fake_backend;
use fake_backend::{Call, FakeBackend};

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn start() -> (Arc<FakeBackend>, AppState, Client) {
    let backend = Arc::new(FakeBackend::new());
    let app = AppState::new(
        config::load_from_str("version: 1\n").unwrap(),
        backend.clone(),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(AcceptAnyCode),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = router::build_router(app.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, routes).await;
    });

    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/v1/ws"))
        .await
        .unwrap();
    (backend, app, ws)
}

fn envelope(pt: PackageType, request_id: i64, data: Vec<u8>) -> Message {
    let input = Input {
        r#type: pt as i32,
        request_id,
        data,
    };
    Message::Binary(input.encode_to_vec())
}

async fn next_output(ws: &mut Client) -> Output {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("response in time")
            .expect("stream open")
            .unwrap();
        if let Message::Binary(b) = msg {
            return Output::decode(b.as_slice()).unwrap();
        }
    }
}

async fn wait_for<F: Fn() -> bool>(cond: F) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn sign_in_heartbeat_and_offline_on_close() {
    let (backend, app, mut ws) = start().await;
    wait_for(|| app.registry().len() == 1).await;

    // Ignored: text frames and anything before sign-in.
    ws.send(Message::Text("hello".into())).await.unwrap();
    ws.send(envelope(PackageType::Heartbeat, 1, Vec::new()))
        .await
        .unwrap();

    let sign_in = SignInInput {
        user_id: 7,
        device_id: 3,
        token: "tok".into(),
    };
    ws.send(envelope(PackageType::SignIn, 2, sign_in.encode_to_vec()))
        .await
        .unwrap();
    let out = next_output(&mut ws).await;
    assert_eq!(out.r#type, PackageType::SignIn as i32);
    assert_eq!(out.request_id, 2);
    assert_eq!(out.code, 0);

    ws.send(envelope(PackageType::Heartbeat, 3, Vec::new()))
        .await
        .unwrap();
    let out = next_output(&mut ws).await;
    assert_eq!(out.r#type, PackageType::Heartbeat as i32);
    assert_eq!(out.request_id, 3);

    match backend.calls().as_slice() {
        [Call::ConnSignIn(_, req)] => assert_eq!(req.conn_fd, 1),
        other => panic!("unexpected calls: {other:?}"),
    }

    ws.close(None).await.unwrap();
    wait_for(|| app.registry().is_empty()).await;
    wait_for(|| {
        backend
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Offline(_, req) if req.user_id == 7 && req.device_id == 3))
    })
    .await;
}

#[tokio::test]
async fn dropped_before_sign_in_makes_no_offline_call() {
    let (backend, app, ws) = start().await;
    wait_for(|| app.registry().len() == 1).await;

    drop(ws);
    wait_for(|| app.registry().is_empty()).await;
    assert!(backend.calls().is_empty());
}
