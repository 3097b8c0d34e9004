//! Logging and tracing setup
//!
//! Installs the process-wide `tracing` subscriber. The filter comes from
//! [`LOG_FILTER_ENV`] when set, otherwise from [`LoggingConfig::level`].
//! Output is human-readable by default or JSON lines when
//! [`LoggingConfig::json`] is set.

use loginguard_domain::{GuardError, LoggingConfig, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable whose directives override the configured level
pub const LOG_FILTER_ENV: &str = "LOGINGUARD_LOG";

/// Install the global tracing subscriber
///
/// # Errors
/// - `GuardError::Config` when the filter directives do not parse
/// - `GuardError::Internal` when a global subscriber is already installed
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    installed.map_err(|e| GuardError::Internal(format!("Failed to install tracing subscriber: {e}")))?;
    tracing::debug!(level = %config.level, json = config.json, "Tracing initialized");
    Ok(())
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match std::env::var(LOG_FILTER_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => config.level.clone(),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| GuardError::Config(format!("Invalid log filter '{directives}': {e}")))
}
