//! Default HTTP health check against the sync server.

use crate::error::ReconnectError;
use crate::interfaces::HealthCheck;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-probe timeout of the default health check.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Probes `GET <server>/v1/sessions`.
///
/// The client ignores proxy environment variables so a misconfigured
/// `HTTPS_PROXY` cannot mask the real reachability of the server. Any
/// status below 500 counts as reachable, including 401 and 404.
#[derive(Clone)]
pub struct HttpHealthCheck {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpHealthCheck {
    pub fn new(server_url: &str) -> Self {
        Self::with_timeout(server_url, HEALTH_CHECK_TIMEOUT)
    }

    pub fn with_timeout(server_url: &str, timeout: Duration) -> Self {
        Self {
            url: sessions_url(server_url),
            client: http_client(timeout),
            timeout,
        }
    }

    /// Endpoint this check probes.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self) -> Result<(), ReconnectError> {
        let _timer = crate::metrics::MetricTimer::new("health_check_latency");

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        debug!("health check {} -> {}", self.url, status);

        if status.as_u16() >= 500 {
            return Err(ReconnectError::http(
                status.as_u16(),
                format!("Server error from {}", self.url),
            ));
        }
        Ok(())
    }
}

/// Client that bypasses proxy environment variables and gives up after
/// `timeout`.
///
/// If the builder fails the plain default client is returned instead, so
/// callers should also set the timeout on each request.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder().no_proxy().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => {
            warn!(
                "Failed to build proxy-free HTTP client, falling back to defaults: {}",
                err
            );
            reqwest::Client::new()
        }
    }
}

/// `<server>/v1/sessions`, tolerating a trailing slash on the server URL.
pub fn sessions_url(server_url: &str) -> String {
    format!("{}/v1/sessions", server_url.trim_end_matches('/'))
}
