//! imgate gateway
//!
//! - WebSocket endpoint: /v1/ws, plus an optional length-framed TCP listener
//! - Sign-in gate, sync / heartbeat / ack routing to the logic service
//! - Token issuance over HTTP
//! - Graceful shutdown on Ctrl-C / SIGTERM

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use imgate_core::error::{GateError, Result};
use imgate_gateway::{app_state::AppState, config, router, transport};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "imgate-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("IMGATE_CONFIG").unwrap_or_else(|_| "imgate.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse().map_err(|e| {
        GateError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}"))
    })?;
    let tcp_listen = cfg.gateway.tcp_listen.clone();

    let state = AppState::from_config(cfg).await?;

    if let Some(addr) = tcp_listen {
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| GateError::Internal(format!("failed to bind {addr}: {e}")))?;
        tracing::info!(%addr, "tcp listener starting");
        tokio::spawn(transport::tcp::serve(listener, state.clone()));
    }

    let app = router::build_router(state);

    tracing::info!(%listen, "imgate-gateway starting");
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| GateError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GateError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
