//! Happy agent host: configuration, logging and the offline-aware bootstrap.

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod session;

pub use bootstrap::{supervise, Bootstrap, Startup};
pub use config::{Config, ConfigError, DEFAULT_CONFIG_FILE, DEFAULT_SERVER_URL};
pub use session::{BootstrapSession, SessionClient, SESSION_REQUEST_TIMEOUT};
