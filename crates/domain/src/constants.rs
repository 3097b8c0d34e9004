//! Application constants
//!
//! Centralized location for the default throttle and retry settings.

// Throttle defaults
pub const DEFAULT_MAX_FAILURES: u32 = 5;
pub const DEFAULT_WINDOW_SECS: u64 = 15 * 60;
pub const DEFAULT_LOCKOUT_SECS: u64 = 15 * 60;
pub const MAX_LOCKOUT_SECS: u64 = 365 * 24 * 60 * 60;

// Retry defaults
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";
