//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use loginguard_domain::GuardError;
use loginguard_infra::config;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_json_file() {
    // Create a temporary JSON config file
    let json_content = r#"{
        "throttle": {
            "max_failures": 5,
            "window_secs": 900,
            "lockout_secs": 1800
        },
        "retry": {
            "max_attempts": 4,
            "base_delay_ms": 200,
            "max_delay_ms": 1000,
            "stop_on_non_retryable": true
        },
        "logging": {
            "level": "loginguard_core=debug,info",
            "json": false
        }
    }"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();

    let config = result.expect("Failed to load config from JSON file");

    // Verify throttle configuration
    assert_eq!(config.throttle.max_failures, 5);
    assert_eq!(config.throttle.lockout_secs, 1800);

    // Verify retry configuration
    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(config.retry.max_delay_ms, Some(1000));
    assert!(config.retry.stop_on_non_retryable);

    // Verify logging configuration
    assert_eq!(config.logging.level, "loginguard_core=debug,info");
}

#[test]
fn test_load_config_from_toml_file_with_defaults() -> anyhow::Result<()> {
    // Only the throttle section; everything else defaults
    let toml_content = r#"
[throttle]
max_failures = 10
window_secs = 3600
"#;

    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(toml_content.as_bytes())?;

    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path)?;

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();

    let config = result?;
    assert_eq!(config.throttle.max_failures, 10);
    assert_eq!(config.throttle.window_secs, 3600);
    assert_eq!(config.throttle.lockout_secs, 900);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.base_delay_ms, 500);
    assert_eq!(config.logging.level, "info");
    Ok(())
}

#[test]
fn test_cap_below_base_delay_is_rejected() {
    let toml_content = r#"
[retry]
base_delay_ms = 1000
max_delay_ms = 100
"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();

    match result {
        Err(GuardError::Config(msg)) => assert!(msg.contains("max_delay_ms"), "unexpected: {msg}"),
        other => panic!("expected validation failure, got {other:?}"),
    }
}
