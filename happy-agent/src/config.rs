use happy_reconnect::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "happy.yaml";
pub const DEFAULT_SERVER_URL: &str = "https://api.cluster-fluster.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Agent host configuration, read from `happy.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub initial_delay_ms: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub saturation_failures: u32,
    pub log_level: String,
    /// Bearer token sent when creating a session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            initial_delay_ms: 5_000,
            min_delay_ms: 5_000,
            max_delay_ms: 60_000,
            saturation_failures: 10,
            log_level: "info".to_string(),
            auth_token: None,
        }
    }
}

impl Config {
    /// Load from `path` (defaults if it does not exist), apply environment
    /// overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// File contents only (defaults if it does not exist), without
    /// environment overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// `HAPPY_SERVER_URL`, `HAPPY_LOG` and `HAPPY_AUTH_TOKEN`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("HAPPY_SERVER_URL").ok(),
            std::env::var("HAPPY_LOG").ok(),
        );
        if let Some(token) = std::env::var("HAPPY_AUTH_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            self.auth_token = Some(token.trim().to_string());
        }
    }

    pub fn apply_overrides(&mut self, server_url: Option<String>, log_level: Option<String>) {
        if let Some(url) = server_url.filter(|v| !v.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
        if let Some(level) = log_level.filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("server_url must not be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "server_url must be an http(s) URL: {}",
                url
            )));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        if self.saturation_failures == 0 {
            return Err(ConfigError::Invalid(
                "saturation_failures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.saturation_failures,
        )
    }
}
