//! Happy offline reconnection
//!
//! Keeps retrying the sync server in the background while the agent runs
//! offline, then re-establishes the session once the server is back.

pub mod backoff;
pub mod engine;
pub mod error;
pub mod handle;
pub mod health;
pub mod interfaces;
pub mod metrics;

pub use backoff::BackoffPolicy;
pub use engine::{
    start_offline_reconnection, OfflineReconnection, AUTH_FAILED_MESSAGE, DEFAULT_INITIAL_DELAY,
    RECONNECTED_MESSAGE,
};
pub use error::{FailureClass, ReconnectError};
pub use handle::{ReconnectionHandle, ReconnectionState};
pub use health::{http_client, sessions_url, HttpHealthCheck, HEALTH_CHECK_TIMEOUT};
pub use interfaces::{health_check_fn, reconnector_fn, FnHealthCheck, FnReconnector, HealthCheck, Reconnector};
