//! Reconnection errors and their retry classification.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by a health check or a reconnector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconnectError {
    /// The server answered with an HTTP status the caller treats as failure.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure, tagged with a socket error code such as `ECONNREFUSED`.
    #[error("Network error ({code}): {message}")]
    Network { code: String, message: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Failure raised by the caller's reconnector.
    #[error("Reconnect error: {0}")]
    Reconnect(String),
}

/// How the retry loop reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Stop permanently.
    Terminal,
    /// Back off and try again.
    Retryable,
}

impl ReconnectError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn reconnect(message: impl Into<String>) -> Self {
        Self::Reconnect(message.into())
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short code suitable for offline reporting: the socket code for
    /// network failures, the status for HTTP failures.
    pub fn code(&self) -> Option<String> {
        match self {
            Self::Http { status, .. } => Some(status.to_string()),
            Self::Network { code, .. } => Some(code.clone()),
            Self::Timeout(_) => Some("ETIMEDOUT".to_string()),
            Self::Reconnect(_) => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.status() == Some(401)
    }

    /// Only a 401 is terminal. Every other failure, including errors from
    /// the reconnector itself, is retried.
    pub fn classify(&self) -> FailureClass {
        if self.is_auth_failure() {
            FailureClass::Terminal
        } else {
            FailureClass::Retryable
        }
    }
}

impl From<reqwest::Error> for ReconnectError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::http(status.as_u16(), err.to_string());
        }
        if let Some(code) = socket_error_code(&err) {
            return Self::network(code, err.to_string());
        }
        if err.is_timeout() {
            return Self::network("ETIMEDOUT", err.to_string());
        }
        if err.is_connect() {
            return Self::network("ECONNREFUSED", err.to_string());
        }
        Self::network("EUNKNOWN", err.to_string())
    }
}

/// Walk the source chain looking for an io error or a resolver failure.
fn socket_error_code(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if let Some(code) = io_error_code(io_err) {
                return Some(code);
            }
        }
        let text = e.to_string().to_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return Some("ENOTFOUND");
        }
        current = e.source();
    }
    None
}

fn io_error_code(err: &io::Error) -> Option<&'static str> {
    if let Some(code) = unreachable_code(err) {
        return Some(code);
    }
    match err.kind() {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => Some("ECONNRESET"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        _ => None,
    }
}

// EHOSTUNREACH and ENETUNREACH have no stable ErrorKind on older toolchains.
#[cfg(target_os = "linux")]
fn unreachable_code(err: &io::Error) -> Option<&'static str> {
    match err.raw_os_error() {
        Some(113) => Some("EHOSTUNREACH"),
        Some(101) => Some("ENETUNREACH"),
        _ => None,
    }
}

#[cfg(not(target_os = "linux"))]
fn unreachable_code(_err: &io::Error) -> Option<&'static str> {
    None
}
