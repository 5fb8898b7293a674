//! Startup path of the agent host.
//!
//! Creates a session once. When that fails the failure goes to the shared
//! offline reporter and an offline reconnection run takes over, using the
//! reachability probe as its health check and session creation as its
//! reconnector.

use crate::config::Config;
use crate::session::{BootstrapSession, SessionClient, SESSION_REQUEST_TIMEOUT};
use async_trait::async_trait;
use happy_offline::{OfflineFailure, OfflineState};
use happy_reconnect::{
    HealthCheck, HttpHealthCheck, OfflineReconnection, ReconnectError, ReconnectionHandle,
    ReconnectionState, Reconnector,
};
use std::sync::Arc;
use tracing::{debug, info};

const SESSION_OPERATION: &str = "Session creation";
const CALLER: &str = "happy-agent";

pub enum Startup {
    Online(BootstrapSession),
    Offline(ReconnectionHandle<BootstrapSession>),
}

#[derive(Clone)]
pub struct Bootstrap {
    server_url: String,
    probe: Arc<dyn HealthCheck>,
    sessions: Arc<dyn Reconnector<BootstrapSession>>,
    offline: Arc<OfflineState>,
}

impl Bootstrap {
    pub fn new(server_url: &str, offline: Arc<OfflineState>) -> Self {
        Self {
            server_url: server_url.to_string(),
            probe: Arc::new(HttpHealthCheck::new(server_url)),
            sessions: Arc::new(SessionClient::new(server_url)),
            offline,
        }
    }

    /// Bootstrap for `config.server_url`, authenticating with
    /// `config.auth_token`.
    pub fn from_config(config: &Config, offline: Arc<OfflineState>) -> Self {
        let sessions =
            SessionClient::new(&config.server_url).with_auth_token(config.auth_token.clone());
        Self::new(&config.server_url, offline).with_sessions(Arc::new(sessions))
    }

    /// Replace the HTTP reachability probe.
    pub fn with_probe(mut self, probe: Arc<dyn HealthCheck>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the session client.
    pub fn with_sessions(mut self, sessions: Arc<dyn Reconnector<BootstrapSession>>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Create a session, giving up after [`SESSION_REQUEST_TIMEOUT`].
    pub async fn connect(&self) -> Result<BootstrapSession, ReconnectError> {
        match tokio::time::timeout(SESSION_REQUEST_TIMEOUT, self.sessions.reconnect()).await {
            Ok(result) => result,
            Err(_) => Err(ReconnectError::Timeout(SESSION_REQUEST_TIMEOUT)),
        }
    }

    /// Connect, or report the failure and fall back to offline reconnection.
    pub async fn start(&self, config: &Config) -> Startup {
        let err = match self.connect().await {
            Ok(session) => {
                info!("Connected to {}", self.server_url);
                return Startup::Online(session);
            }
            Err(err) => err,
        };

        let mut failure = OfflineFailure::new(SESSION_OPERATION)
            .with_caller(CALLER)
            .with_url(self.server_url.clone())
            .with_detail(err.to_string());
        if let Some(code) = err.code() {
            failure = failure.with_error_code(code);
        }
        self.offline.fail(failure);

        let handle = OfflineReconnection::new(
            self.server_url.clone(),
            BootstrapReconnector {
                bootstrap: self.clone(),
            },
            |message: &str| println!("{}", message),
        )
        .with_health_check(SharedProbe(Arc::clone(&self.probe)))
        .with_initial_delay(config.initial_delay())
        .with_backoff(config.backoff())
        .with_cleanup(|| debug!("Offline reconnection cleaned up"))
        .start();

        Startup::Offline(handle)
    }
}

/// Wait for the run to finish and leave offline mode if it reconnected.
pub async fn supervise(
    handle: &ReconnectionHandle<BootstrapSession>,
    offline: &OfflineState,
) -> ReconnectionState {
    let state = handle.wait_terminal().await;
    if state == ReconnectionState::Reconnected {
        offline.recover();
    }
    state
}

struct BootstrapReconnector {
    bootstrap: Bootstrap,
}

#[async_trait]
impl Reconnector<BootstrapSession> for BootstrapReconnector {
    async fn reconnect(&self) -> Result<BootstrapSession, ReconnectError> {
        self.bootstrap.connect().await
    }
}

struct SharedProbe(Arc<dyn HealthCheck>);

#[async_trait]
impl HealthCheck for SharedProbe {
    async fn check(&self) -> Result<(), ReconnectError> {
        self.0.check().await
    }
}
