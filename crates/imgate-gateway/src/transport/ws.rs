//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS (sign-in happens in-band, not on the upgrade)
//! - Register the connection and hand every binary frame to the dispatcher
//! - Lifecycle: ping + idle timeout
//! - On exit, unregister and run the dispatcher's close hook

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Duration, Instant};
use tracing::{debug, info_span, Instrument};

use crate::app_state::AppState;
use crate::dispatch::{ConnState, Outbound};
use crate::transport::codec::{decode, Inbound};

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max = app.cfg().gateway.max_frame_bytes;
    ws.max_message_size(max)
        .on_upgrade(move |socket| run_session(app, socket))
}

// --------------------
// Core session loop
// --------------------
async fn run_session(app: AppState, socket: WebSocket) {
    let gw = app.cfg().gateway.clone();
    let registry = app.registry();
    let dispatcher = app.dispatcher();

    // ---- outbound channel
    let (out, mut out_rx) = Outbound::bounded(gw.outbound_queue, gw.max_frame_bytes);
    let mut conn = ConnState::new(registry.register(out.clone()));
    let span = info_span!("ws_conn", conn = conn.handle());

    async {
        debug!("connected");

        // ---- split socket
        let (mut ws_tx, mut ws_rx) = socket.split();

        // ---- timers
        let ping_every = Duration::from_millis(gw.ping_interval_ms);
        let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);

        let mut ping_tick = tokio::time::interval(ping_every);
        ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                // outbound writer
                maybe_out = out_rx.recv() => {
                    match maybe_out {
                        Some(env) => {
                            if ws_tx.send(Message::Binary(env.to_vec())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                // inbound reader
                incoming = ws_rx.next() => {
                    let Some(incoming) = incoming else { break; };
                    let Ok(msg) = incoming else { break; };

                    last_activity = Instant::now();

                    match decode(msg) {
                        Inbound::Frame(frame) => {
                            dispatcher.on_frame(&mut conn, &out, &frame).await;
                        }
                        Inbound::Text { bytes_len } => {
                            debug!(bytes_len, "ignoring text frame");
                        }
                        Inbound::Ping(payload) => {
                            let _ = ws_tx.send(Message::Pong(payload)).await;
                        }
                        Inbound::Pong => {}
                        Inbound::Close => break,
                    }
                }

                // ping
                _ = ping_tick.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }

                // idle timeout
                _ = tokio::time::sleep(Duration::from_millis(250)) => {
                    if last_activity.elapsed() >= idle_timeout {
                        debug!("idle timeout");
                        break;
                    }
                }
            }
        }

        registry.remove(conn.handle());
        dispatcher.on_close(&conn).await;
        debug!("closed");
    }
    .instrument(span)
    .await
}
