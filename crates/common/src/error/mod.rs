//! Common error types and classification utilities
//!
//! The throttling and retry primitives never inspect error text. Instead,
//! errors describe themselves through [`ErrorClassification`], which the retry
//! policies and the login service use to decide whether another attempt makes
//! sense and how loudly a failure should be reported.
//!
//! ## ErrorClassification Trait
//!
//! - **`is_retryable()`**: Can this operation be retried?
//! - **`severity()`**: How serious is this error? (Info/Warning/Error/Critical)
//! - **`is_critical()`**: Does this require immediate attention?
//! - **`retry_after()`**: Suggested retry delay (if applicable)
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Wrong password |
//! | **Warning** | Degraded but operational | Rate limiting, transient network failures |
//! | **Error** | Failure requiring attention | Invalid configuration |
//! | **Critical** | System integrity at risk | Internal invariant violations |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Configuration validation error shared by the resilience primitives.
///
/// Raised at construction time. A `ConfigError` is a programming or
/// deployment defect, never a runtime condition to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A configuration field holds a value outside its allowed range
    #[error("Invalid configuration for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    /// Create an invalid-field error
    pub fn invalid<S: Into<String>>(field: &'static str, message: S) -> Self {
        Self::Invalid { field, message: message.into() }
    }

    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            Self::Invalid { field, .. } => field,
        }
    }
}

impl ErrorClassification for ConfigError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Result type for configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error classification trait for consistent error handling across modules
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use loginguard_common::error::{ErrorClassification, ErrorSeverity};
///
/// #[derive(Debug)]
/// enum GatewayError {
///     Busy { retry_after: Duration },
///     Rejected,
/// }
///
/// impl ErrorClassification for GatewayError {
///     fn is_retryable(&self) -> bool {
///         matches!(self, Self::Busy { .. })
///     }
///
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             Self::Busy { .. } => ErrorSeverity::Warning,
///             Self::Rejected => ErrorSeverity::Info,
///         }
///     }
///
///     fn retry_after(&self) -> Option<Duration> {
///         match self {
///             Self::Busy { retry_after } => Some(*retry_after),
///             Self::Rejected => None,
///         }
///     }
/// }
///
/// let busy = GatewayError::Busy { retry_after: Duration::from_secs(2) };
/// assert!(busy.is_retryable());
/// assert!(!busy.is_critical());
/// ```
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again, such as network timeouts or temporary service unavailability.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when a specific wait is known (for example
    /// the remaining time of a lockout), or `None` otherwise.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_config_error_is_not_retryable() {
        let err = ConfigError::invalid("max_attempts", "must be at least 1");

        assert!(!err.is_retryable());
        assert!(!err.is_critical());
        assert_eq!(err.field(), "max_attempts");
        assert_eq!(err.retry_after(), None);
        assert!(err.to_string().contains("must be at least 1"));
    }
}
