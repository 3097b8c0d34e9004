//! Configuration loader
//!
//! Loads the guard configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every configuration is validated before it is returned.
//!
//! ## Environment Variables
//! Required:
//! - `LOGINGUARD_MAX_FAILURES`: Failures that trigger a lockout
//! - `LOGINGUARD_WINDOW_SECS`: Sliding failure window in seconds
//! - `LOGINGUARD_LOCKOUT_SECS`: Lockout length in seconds
//! - `LOGINGUARD_RETRY_MAX_ATTEMPTS`: Attempt ceiling per sign-in
//! - `LOGINGUARD_RETRY_BASE_DELAY_MS`: First backoff delay in milliseconds
//!
//! Optional:
//! - `LOGINGUARD_RETRY_MAX_DELAY_MS`: Cap on a single backoff delay
//! - `LOGINGUARD_RETRY_STOP_ON_NON_RETRYABLE`: Stop early on non-retryable
//!   failures (true/false)
//! - `LOGINGUARD_LOG_LEVEL`: Log filter directive
//! - `LOGINGUARD_LOG_JSON`: JSON log output (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./loginguard.json` or `./loginguard.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use loginguard_domain::{
    GuardConfig, GuardError, LoggingConfig, Result, RetrySettings, ThrottleSettings,
};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["loginguard.json", "loginguard.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `GuardError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<GuardConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `GuardError::Config` if required variables are missing, hold
/// unparseable values, or fail validation.
pub fn load_from_env() -> Result<GuardConfig> {
    let throttle = ThrottleSettings {
        max_failures: env_parse("LOGINGUARD_MAX_FAILURES")?,
        window_secs: env_parse("LOGINGUARD_WINDOW_SECS")?,
        lockout_secs: env_parse("LOGINGUARD_LOCKOUT_SECS")?,
    };

    let retry = RetrySettings {
        max_attempts: env_parse("LOGINGUARD_RETRY_MAX_ATTEMPTS")?,
        base_delay_ms: env_parse("LOGINGUARD_RETRY_BASE_DELAY_MS")?,
        max_delay_ms: env_parse_opt("LOGINGUARD_RETRY_MAX_DELAY_MS")?,
        stop_on_non_retryable: env_bool("LOGINGUARD_RETRY_STOP_ON_NON_RETRYABLE", false),
    };

    let defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        level: std::env::var("LOGINGUARD_LOG_LEVEL").unwrap_or(defaults.level),
        json: env_bool("LOGINGUARD_LOG_JSON", defaults.json),
    };

    let config = GuardConfig { throttle, retry, logging };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Sections and fields missing from the file take their defaults.
///
/// # Errors
/// Returns `GuardError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<GuardConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(GuardError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            GuardError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| GuardError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<GuardConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| GuardError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| GuardError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(GuardError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory first, then the directory of the
/// running executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    candidates_in(&dirs).into_iter().find(|path| path.exists())
}

fn candidates_in(dirs: &[PathBuf]) -> Vec<PathBuf> {
    dirs.iter().flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name))).collect()
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| GuardError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse a required environment variable
fn env_parse<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env_var(key)?;
    raw.trim().parse::<T>().map_err(|e| GuardError::Config(format!("Invalid {}: {}", key, e)))
}

/// Parse an optional environment variable; unset means `None`
fn env_parse_opt<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(_) => env_parse(key).map(Some),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
