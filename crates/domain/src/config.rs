//! Configuration structures
//!
//! Every section carries serde defaults so a partial file (or none at all)
//! yields a usable configuration. Call [`GuardConfig::validate`] before use;
//! the loader in `loginguard-infra` does so for every source.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOCKOUT_SECS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_FAILURES, DEFAULT_RETRY_BASE_DELAY_MS,
    DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_WINDOW_SECS, MAX_LOCKOUT_SECS,
};
use crate::errors::{GuardError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub throttle: ThrottleSettings,
    pub retry: RetrySettings,
    pub logging: LoggingConfig,
}

impl GuardConfig {
    /// Reject values the throttle and retry primitives cannot work with
    pub fn validate(&self) -> Result<()> {
        self.throttle.validate()?;
        self.retry.validate()
    }
}

/// Local lockout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub max_failures: u32,
    pub window_secs: u64,
    pub lockout_secs: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            window_secs: DEFAULT_WINDOW_SECS,
            lockout_secs: DEFAULT_LOCKOUT_SECS,
        }
    }
}

impl ThrottleSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn lockout(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.max_failures == 0 {
            return Err(GuardError::Config("throttle.max_failures must be greater than 0".into()));
        }
        if self.window_secs == 0 {
            return Err(GuardError::Config("throttle.window_secs must be greater than 0".into()));
        }
        if self.lockout_secs == 0 {
            return Err(GuardError::Config("throttle.lockout_secs must be greater than 0".into()));
        }
        if self.lockout_secs > MAX_LOCKOUT_SECS {
            return Err(GuardError::Config(format!(
                "throttle.lockout_secs must not exceed {MAX_LOCKOUT_SECS}"
            )));
        }
        Ok(())
    }
}

/// Backoff retry settings for the remote sign-in call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: Option<u64>,
    /// Stop retrying as soon as a failure is classified non-retryable
    pub stop_on_non_retryable: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: None,
            stop_on_non_retryable: false,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(GuardError::Config("retry.max_attempts must be at least 1".into()));
        }
        if let Some(cap) = self.max_delay_ms {
            if cap < self.base_delay_ms {
                return Err(GuardError::Config(format!(
                    "retry.max_delay_ms ({cap}) must not be below retry.base_delay_ms ({})",
                    self.base_delay_ms
                )));
            }
        }
        Ok(())
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `loginguard_core=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}
