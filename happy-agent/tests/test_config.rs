#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use happy_agent::{Config, ConfigError, DEFAULT_SERVER_URL};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    assert_eq!(config.initial_delay(), Duration::from_millis(5_000));

    let backoff = config.backoff();
    assert_eq!(backoff.min_delay(), Duration::from_millis(5_000));
    assert_eq!(backoff.max_delay(), Duration::from_millis(60_000));
    assert_eq!(backoff.saturation_failures(), 10);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml("server_url: http://localhost:3005\ninitial_delay_ms: 250\n").unwrap();
    assert_eq!(config.server_url, "http://localhost:3005");
    assert_eq!(config.initial_delay(), Duration::from_millis(250));
    assert_eq!(config.max_delay_ms, 60_000);
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_empty_yaml_is_default() {
    assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
}

#[test]
fn test_invalid_yaml() {
    let result = Config::from_yaml("server_url: [unclosed");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("happy.yaml");
    fs::write(
        &path,
        "server_url: https://staging.example.com\nmin_delay_ms: 1000\nmax_delay_ms: 2000\n",
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.server_url, "https://staging.example.com");
    assert_eq!(config.min_delay_ms, 1_000);
    assert_eq!(config.backoff().max_delay(), Duration::from_millis(2_000));
}

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::from_file(&temp_dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_keeps_fields_env_cannot_override() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("happy.yaml");
    fs::write(&path, "initial_delay_ms: 750
saturation_failures: 4
").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.initial_delay(), Duration::from_millis(750));
    assert_eq!(config.backoff().saturation_failures(), 4);
}

#[test]
fn test_load_rejects_invalid_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("happy.yaml");
    fs::write(&path, "min_delay_ms: 9000
max_delay_ms: 10
").unwrap();

    assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_auth_token_from_yaml() {
    let config = Config::from_yaml("auth_token: secret\n").unwrap();
    assert_eq!(config.auth_token.as_deref(), Some("secret"));
    assert_eq!(Config::default().auth_token, None);
}

#[test]
fn test_overrides() {
    let mut config = Config::default();
    config.apply_overrides(Some(" http://10.0.0.2:3005 ".to_string()), Some("debug".to_string()));
    assert_eq!(config.server_url, "http://10.0.0.2:3005");
    assert_eq!(config.log_level, "debug");

    config.apply_overrides(Some("   ".to_string()), None);
    assert_eq!(config.server_url, "http://10.0.0.2:3005");
}

#[test]
fn test_validation_errors() {
    let config = Config {
        server_url: String::new(),
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let config = Config {
        server_url: "ftp://example.com".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());

    let config = Config {
        min_delay_ms: 10_000,
        max_delay_ms: 1_000,
        ..Config::default()
    };
    assert!(config.validate().is_err());

    let config = Config {
        saturation_failures: 0,
        ..Config::default()
    };
    assert!(config.validate().is_err());
}
