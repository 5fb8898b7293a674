//! Offline reconnection loop.
//!
//! One spawned task per run. Attempts are strictly sequential: initial
//! delay, health check, reconnector, then either success, a permanent auth
//! failure, or a jittered backoff before the next attempt. Cancellation is
//! cooperative and checked after every await point.

use crate::backoff::BackoffPolicy;
use crate::error::{FailureClass, ReconnectError};
use crate::handle::{Cleanup, ReconnectionHandle, ReconnectionState, Shared};
use crate::health::HttpHealthCheck;
use crate::interfaces::{HealthCheck, Reconnector};
use crate::metrics::{self, MetricTimer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sent once when the session is re-established.
pub const RECONNECTED_MESSAGE: &str = "✅ Reconnected! Session syncing in background.";

/// Sent once when the server rejects our credentials.
pub const AUTH_FAILED_MESSAGE: &str =
    "❌ Authentication failed. Please re-authenticate with `happy auth`.";

/// Delay before the first attempt.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(5_000);

type Notifier = Arc<dyn Fn(&str) + Send + Sync>;

/// Builder for an offline reconnection run.
///
/// ```no_run
/// use happy_reconnect::{reconnector_fn, OfflineReconnection, ReconnectError};
///
/// # async fn demo() {
/// let handle = OfflineReconnection::new(
///     "https://api.example.com",
///     reconnector_fn(|| async { Ok::<_, ReconnectError>("session") }),
///     |message: &str| println!("{}", message),
/// )
/// .start();
///
/// handle.wait_terminal().await;
/// # }
/// ```
pub struct OfflineReconnection<T> {
    server_url: String,
    reconnector: Arc<dyn Reconnector<T>>,
    notifier: Notifier,
    cleanup: Option<Cleanup>,
    health_check: Option<Arc<dyn HealthCheck>>,
    initial_delay: Duration,
    backoff: BackoffPolicy,
}

impl<T: Send + 'static> OfflineReconnection<T> {
    pub fn new<R, N>(server_url: impl Into<String>, reconnector: R, notifier: N) -> Self
    where
        R: Reconnector<T> + 'static,
        N: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            server_url: server_url.into(),
            reconnector: Arc::new(reconnector),
            notifier: Arc::new(notifier),
            cleanup: None,
            health_check: None,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Replace the default HTTP probe.
    pub fn with_health_check<H: HealthCheck + 'static>(mut self, health_check: H) -> Self {
        self.health_check = Some(Arc::new(health_check));
        self
    }

    /// Hook run synchronously on every `cancel()`.
    pub fn with_cleanup<F: Fn() + Send + Sync + 'static>(mut self, cleanup: F) -> Self {
        self.cleanup = Some(Arc::new(cleanup));
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Spawn the retry loop. Must be called from within a Tokio runtime.
    pub fn start(self) -> ReconnectionHandle<T> {
        let health_check = self
            .health_check
            .unwrap_or_else(|| Arc::new(HttpHealthCheck::new(&self.server_url)));
        let shared = Arc::new(Shared::new());

        let driver = Driver {
            shared: Arc::clone(&shared),
            server_url: self.server_url,
            health_check,
            reconnector: self.reconnector,
            notifier: self.notifier,
            backoff: self.backoff,
        };

        debug!(
            "Starting offline reconnection to {} in {:?}",
            driver.server_url, self.initial_delay
        );
        tokio::spawn(driver.run(self.initial_delay));

        ReconnectionHandle::new(shared, self.cleanup)
    }
}

/// Start a run with the default health check, initial delay and backoff.
pub fn start_offline_reconnection<T, R, N>(
    server_url: impl Into<String>,
    reconnector: R,
    notifier: N,
) -> ReconnectionHandle<T>
where
    T: Send + 'static,
    R: Reconnector<T> + 'static,
    N: Fn(&str) + Send + Sync + 'static,
{
    OfflineReconnection::new(server_url, reconnector, notifier).start()
}

struct Driver<T> {
    shared: Arc<Shared<T>>,
    server_url: String,
    health_check: Arc<dyn HealthCheck>,
    reconnector: Arc<dyn Reconnector<T>>,
    notifier: Notifier,
    backoff: BackoffPolicy,
}

impl<T: Send + 'static> Driver<T> {
    async fn run(self, initial_delay: Duration) {
        let mut delay = initial_delay;
        loop {
            if !self.sleep_unless_cancelled(delay).await {
                return;
            }
            match self.attempt().await {
                Some(next) => delay = next,
                None => return,
            }
        }
    }

    /// Returns false if cancellation arrived before the delay elapsed.
    async fn sleep_unless_cancelled(&self, delay: Duration) -> bool {
        let mut rx = self.shared.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = rx.wait_for(|state| *state == ReconnectionState::Cancelled) => false,
        }
    }

    /// One attempt. Returns the delay before the next attempt, or `None`
    /// when the run is over.
    async fn attempt(&self) -> Option<Duration> {
        let attempt = {
            let retry = self.shared.retry.lock();
            if retry.reconnected || retry.cancelled {
                return None;
            }
            retry.failures + 1
        };

        self.shared
            .transition(ReconnectionState::Attempting { attempt });
        metrics::increment_attempts();
        debug!("Reconnection attempt {} to {}", attempt, self.server_url);

        if let Err(err) = self.health_check.check().await {
            return self.on_failure("health check", err);
        }

        if self.shared.is_cancelled() {
            debug!("Reconnection cancelled during health check");
            return None;
        }

        let result = {
            let _timer = MetricTimer::new("reconnect_latency");
            self.reconnector.reconnect().await
        };
        let session = match result {
            Ok(session) => session,
            Err(err) => return self.on_failure("reconnect", err),
        };

        let failures = {
            let mut retry = self.shared.retry.lock();
            if retry.cancelled {
                // Keep work that already completed, but report nothing.
                retry.session = Some(session);
                debug!("Reconnection cancelled during reconnect; session retained");
                return None;
            }
            if retry.reconnected {
                return None;
            }
            retry.reconnected = true;
            retry.session = Some(session);
            self.shared.transition(ReconnectionState::Reconnected);
            retry.failures
        };

        metrics::increment_successes();
        info!(
            "Reconnected to {} after {} failed attempt(s)",
            self.server_url, failures
        );
        (self.notifier)(RECONNECTED_MESSAGE);
        None
    }

    fn on_failure(&self, stage: &str, err: ReconnectError) -> Option<Duration> {
        let mut retry = self.shared.retry.lock();
        if retry.cancelled {
            debug!("Ignoring {} failure after cancellation: {}", stage, err);
            return None;
        }

        match err.classify() {
            FailureClass::Terminal => {
                self.shared.transition(ReconnectionState::AuthFailed);
                drop(retry);
                warn!(
                    "Reconnection to {} stopped, {} rejected credentials: {}",
                    self.server_url, stage, err
                );
                (self.notifier)(AUTH_FAILED_MESSAGE);
                None
            }
            FailureClass::Retryable => {
                retry.failures += 1;
                let failures = retry.failures;
                let delay = self.backoff.delay(failures);
                self.shared
                    .transition(ReconnectionState::WaitingRetry { failures, delay });
                drop(retry);

                metrics::increment_failures();
                debug!(
                    "Reconnection {} failed (failure {}): {}. Retrying in {:?}",
                    stage, failures, err, delay
                );
                Some(delay)
            }
        }
    }
}
