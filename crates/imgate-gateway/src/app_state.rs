//! Shared application state for the imgate gateway.
//!
//! Built once at startup and cloned into every transport task and HTTP
//! handler. Collaborators are injected so tests can swap in fakes.

use std::sync::Arc;
use std::time::Duration;

use imgate_core::error::Result;

use crate::auth::{
    AcceptAnyCode, Authenticator, CodeVerifier, FixedCode, InMemorySessionStore,
    InMemoryUserStore, RedisSessionStore, SessionStore, UserStore,
};
use crate::backend::{GrpcLogicBackend, LogicBackend};
use crate::config::{GatewayConfig, StoreKind};
use crate::dispatch::{DispatchOptions, Dispatcher};
use crate::realtime::ConnRegistry;

const REDIS_NAMESPACE: &str = "imgate";

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<ConnRegistry>,
    auth: Arc<Authenticator>,
}

struct AppStateInner {
    cfg: GatewayConfig,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    pub fn new(
        cfg: GatewayConfig,
        backend: Arc<dyn LogicBackend>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        verifier: Arc<dyn CodeVerifier>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::clone(&backend),
            cfg.gateway.conn_addr.as_str(),
            DispatchOptions {
                reject_replies: cfg.dispatch.reject_replies,
            },
        );
        let auth = Authenticator::new(
            sessions,
            users,
            verifier,
            backend,
            cfg.auth.token_ttl_months,
        );

        Self {
            inner: Arc::new(AppStateInner { cfg }),
            dispatcher: Arc::new(dispatcher),
            registry: Arc::new(ConnRegistry::new()),
            auth: Arc::new(auth),
        }
    }

    /// Build production collaborators from config.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub async fn from_config(cfg: GatewayConfig) -> Result<Self> {
        let backend: Arc<dyn LogicBackend> = Arc::new(GrpcLogicBackend::connect_lazy(
            &cfg.logic.endpoint,
            Duration::from_millis(cfg.logic.timeout_ms),
        )?);

        let sessions: Arc<dyn SessionStore> = match cfg.auth.store {
            StoreKind::Memory => Arc::new(InMemorySessionStore::new()),
            StoreKind::Redis => {
                let url = cfg.auth.redis_url.as_deref().unwrap_or_default();
                Arc::new(RedisSessionStore::connect(url, REDIS_NAMESPACE).await?)
            }
        };

        let verifier: Arc<dyn CodeVerifier> = match &cfg.auth.verification_code {
            Some(code) => Arc::new(FixedCode(code.clone())),
            None => {
                tracing::warn!("auth.verification_code unset: every verification code is accepted");
                Arc::new(AcceptAnyCode)
            }
        };

        Ok(Self::new(
            cfg,
            backend,
            sessions,
            Arc::new(InMemoryUserStore::new()),
            verifier,
        ))
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn registry(&self) -> Arc<ConnRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn auth(&self) -> Arc<Authenticator> {
        Arc::clone(&self.auth)
    }
}
