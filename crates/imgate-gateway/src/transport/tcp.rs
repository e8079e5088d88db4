//! Length-framed TCP transport.
//!
//! One task per connection: the reader decodes frames and runs them through
//! the dispatcher strictly in order; a spawned writer drains the outbound
//! queue. A framing error cannot be resynchronised, so it ends the
//! connection.

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, info_span, warn, Instrument};

use imgate_core::protocol::frame::{encode_frame, FrameDecoder};

use crate::app_state::AppState;
use crate::dispatch::{ConnState, Outbound};

const READ_BUF: usize = 4096;

/// Accept loop. Runs until the process exits.
pub async fn serve(listener: TcpListener, app: AppState) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let app = app.clone();
                tokio::spawn(run_conn(app, stream).instrument(info_span!("tcp_conn", %peer)));
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn run_conn(app: AppState, stream: TcpStream) {
    let gw = app.cfg().gateway.clone();
    let registry = app.registry();
    let dispatcher = app.dispatcher();

    let (out, mut out_rx) = Outbound::bounded(gw.outbound_queue, gw.max_frame_bytes);
    let mut conn = ConnState::new(registry.register(out.clone()));
    debug!(conn = conn.handle(), "connected");

    let (mut rd, mut wr) = stream.into_split();

    let writer = tokio::spawn(
        async move {
            while let Some(env) = out_rx.recv().await {
                let frame = match encode_frame(&env) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, "dropping unframeable envelope");
                        continue;
                    }
                };
                if let Err(e) = wr.write_all(&frame).await {
                    debug!(error = %e, "write failed");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let decoder = FrameDecoder::new(gw.max_frame_bytes);
    let idle = Duration::from_millis(gw.idle_timeout_ms);
    let mut buf = BytesMut::with_capacity(READ_BUF);

    'read: loop {
        match timeout(idle, rd.read_buf(&mut buf)).await {
            Err(_) => {
                debug!(conn = conn.handle(), "idle timeout");
                break;
            }
            Ok(Err(e)) => {
                debug!(conn = conn.handle(), error = %e, "read failed");
                break;
            }
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => {}
        }

        loop {
            match decoder.decode(&mut buf) {
                Ok(Some(frame)) => dispatcher.on_frame(&mut conn, &out, &frame).await,
                Ok(None) => break,
                Err(e) => {
                    warn!(conn = conn.handle(), error = %e, "closing on framing error");
                    break 'read;
                }
            }
        }
    }

    registry.remove(conn.handle());
    drop(out);
    dispatcher.on_close(&conn).await;
    let _ = writer.await;
    debug!(conn = conn.handle(), "closed");
}
