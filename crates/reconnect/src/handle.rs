//! Caller-facing control object for one reconnection run.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Observable phase of a reconnection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectionState {
    /// Waiting for the initial delay to elapse.
    Idle,
    /// Health check or reconnector in flight.
    Attempting { attempt: u32 },
    /// Backing off after `failures` failed attempts.
    WaitingRetry { failures: u32, delay: Duration },
    Reconnected,
    AuthFailed,
    Cancelled,
}

impl ReconnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconnectionState::Reconnected
                | ReconnectionState::AuthFailed
                | ReconnectionState::Cancelled
        )
    }
}

/// Mutable retry bookkeeping. Only the driver task writes `failures`,
/// `reconnected` and `session`; `cancelled` is written by the handle.
pub(crate) struct RetryState<T> {
    pub(crate) failures: u32,
    pub(crate) cancelled: bool,
    pub(crate) reconnected: bool,
    pub(crate) session: Option<T>,
}

pub(crate) struct Shared<T> {
    pub(crate) retry: Mutex<RetryState<T>>,
    state_tx: watch::Sender<ReconnectionState>,
}

impl<T> Shared<T> {
    pub(crate) fn new() -> Self {
        let (state_tx, _) = watch::channel(ReconnectionState::Idle);
        Self {
            retry: Mutex::new(RetryState {
                failures: 0,
                cancelled: false,
                reconnected: false,
                session: None,
            }),
            state_tx,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.retry.lock().cancelled
    }

    /// Publish `next` unless the run already reached a terminal state.
    pub(crate) fn transition(&self, next: ReconnectionState) {
        self.state_tx.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ReconnectionState> {
        self.state_tx.subscribe()
    }

    fn state(&self) -> ReconnectionState {
        self.state_tx.borrow().clone()
    }
}

pub(crate) type Cleanup = Arc<dyn Fn() + Send + Sync>;

/// Handle returned when an offline reconnection run starts.
///
/// Dropping the handle does not stop the run; call [`cancel`](Self::cancel).
pub struct ReconnectionHandle<T> {
    shared: Arc<Shared<T>>,
    cleanup: Option<Cleanup>,
}

impl<T> Clone for ReconnectionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            cleanup: self.cleanup.clone(),
        }
    }
}

impl<T> ReconnectionHandle<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>, cleanup: Option<Cleanup>) -> Self {
        Self { shared, cleanup }
    }

    /// Stop scheduling attempts and run the cleanup hook.
    ///
    /// Safe to call from any state and any number of times; cleanup runs on
    /// every call. An attempt already in flight is not aborted, its result
    /// is discarded when it returns.
    pub fn cancel(&self) {
        {
            let mut retry = self.shared.retry.lock();
            if !retry.cancelled {
                retry.cancelled = true;
                self.shared.transition(ReconnectionState::Cancelled);
                info!("Offline reconnection cancelled");
            }
        }

        if let Some(cleanup) = &self.cleanup {
            cleanup();
        }
    }

    pub fn is_reconnected(&self) -> bool {
        self.shared.retry.lock().reconnected
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Session produced by the reconnector, if any.
    ///
    /// A reconnector that completes after cancellation still stores its
    /// session here while `is_reconnected()` stays false.
    pub fn session(&self) -> Option<T>
    where
        T: Clone,
    {
        self.shared.retry.lock().session.clone()
    }

    /// Move the session out of the handle.
    pub fn take_session(&self) -> Option<T> {
        self.shared.retry.lock().session.take()
    }

    /// Failed attempts so far.
    pub fn failures(&self) -> u32 {
        self.shared.retry.lock().failures
    }

    pub fn state(&self) -> ReconnectionState {
        self.shared.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReconnectionState> {
        self.shared.subscribe()
    }

    /// Wait until the run is reconnected, auth-failed or cancelled.
    pub async fn wait_terminal(&self) -> ReconnectionState {
        let mut rx = self.shared.subscribe();
        let result = match rx.wait_for(ReconnectionState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.shared.state(),
        };
        result
    }
}
