//! Session creation against the sync server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use happy_reconnect::{http_client, sessions_url, ReconnectError, Reconnector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Timeout of a single session-creation request.
pub const SESSION_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SESSION_TAG: &str = "happy-agent";

/// Server connection established by the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSession {
    pub server_url: String,
    /// Identifier assigned by the server, when it returned one.
    pub session_id: Option<String>,
    pub connected_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    tag: &'a str,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    session: Option<SessionBody>,
}

#[derive(Deserialize)]
struct SessionBody {
    id: String,
}

/// Creates sessions with `POST <server>/v1/sessions`.
///
/// Any non-success status becomes [`ReconnectError::Http`], so a 401 here
/// stops an offline reconnection run for good.
#[derive(Clone)]
pub struct SessionClient {
    server_url: String,
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    auth_token: Option<String>,
}

impl SessionClient {
    pub fn new(server_url: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            url: sessions_url(server_url),
            client: http_client(SESSION_REQUEST_TIMEOUT),
            timeout: SESSION_REQUEST_TIMEOUT,
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, auth_token: Option<String>) -> Self {
        self.auth_token = auth_token;
        self
    }

    pub async fn create_session(&self) -> Result<BootstrapSession, ReconnectError> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&CreateSessionRequest { tag: SESSION_TAG });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("session request {} -> {}", self.url, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Session request failed")
                    .to_string()
            } else {
                body
            };
            return Err(ReconnectError::http(status.as_u16(), message));
        }

        // The body is informational; an empty or unexpected one still counts.
        let session_id = response
            .json::<CreateSessionResponse>()
            .await
            .ok()
            .and_then(|body| body.session)
            .map(|session| session.id);

        Ok(BootstrapSession {
            server_url: self.server_url.clone(),
            session_id,
            connected_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Reconnector<BootstrapSession> for SessionClient {
    async fn reconnect(&self) -> Result<BootstrapSession, ReconnectError> {
        self.create_session().await
    }
}
