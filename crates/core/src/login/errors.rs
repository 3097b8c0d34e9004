//! Login error types

use std::time::Duration;

use loginguard_common::error::{ConfigError, ErrorClassification, ErrorSeverity};
use loginguard_common::resilience::{RetryError, ThrottleError};
use thiserror::Error;

use super::ports::SignInFailure;

/// Terminal outcome of a guarded sign-in that did not produce a session
#[derive(Debug, Error)]
pub enum LoginError<E = SignInFailure> {
    /// Refused locally without contacting the authentication service
    #[error("Too many failed sign-in attempts, retry after {retry_after:?}")]
    RateLimited { identity: String, retry_after: Duration },

    /// The authentication service's last failure, unchanged
    #[error("Sign-in failed after {attempts} attempt(s)")]
    SignIn {
        #[source]
        source: E,
        attempts: u32,
    },

    /// The caller cancelled while waiting to retry
    #[error("Sign-in cancelled after {attempts} attempt(s)")]
    Cancelled { last_failure: E, attempts: u32 },

    /// The retry plan was rejected before anything ran
    #[error("Login guard misconfigured: {0}")]
    Misconfigured(#[from] ConfigError),
}

impl<E> LoginError<E> {
    /// Failure reported by the authentication service, if one was received
    pub fn sign_in_failure(&self) -> Option<&E> {
        match self {
            Self::SignIn { source, .. } => Some(source),
            Self::Cancelled { last_failure, .. } => Some(last_failure),
            Self::RateLimited { .. } | Self::Misconfigured(_) => None,
        }
    }

    /// Whether the local lockout refused the attempt
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl<E> From<ThrottleError> for LoginError<E> {
    fn from(err: ThrottleError) -> Self {
        match err {
            ThrottleError::RateLimitExceeded { identity, retry_after } => {
                Self::RateLimited { identity, retry_after }
            }
        }
    }
}

impl<E> From<RetryError<E>> for LoginError<E> {
    fn from(err: RetryError<E>) -> Self {
        match err {
            RetryError::Operation { source, attempts } => Self::SignIn { source, attempts },
            RetryError::Cancelled { last_failure, attempts } => {
                Self::Cancelled { last_failure, attempts }
            }
            RetryError::InvalidPlan(config) => Self::Misconfigured(config),
        }
    }
}

impl<E: ErrorClassification> ErrorClassification for LoginError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::SignIn { source, .. } => source.is_retryable(),
            Self::RateLimited { .. } | Self::Cancelled { .. } | Self::Misconfigured(_) => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RateLimited { .. } => ErrorSeverity::Warning,
            Self::SignIn { source, .. } => source.severity(),
            Self::Cancelled { .. } => ErrorSeverity::Info,
            Self::Misconfigured(_) => ErrorSeverity::Critical,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            Self::SignIn { source, .. } => source.retry_after(),
            Self::Cancelled { .. } | Self::Misconfigured(_) => None,
        }
    }
}

impl LoginError<SignInFailure> {
    /// Message suitable for showing on the login form
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited { retry_after, .. } => {
                let minutes = retry_after.as_secs().div_ceil(60).max(1);
                let unit = if minutes == 1 { "minute" } else { "minutes" };
                format!("Too many failed attempts. Try again in {minutes} {unit}.")
            }
            Self::SignIn { source, .. } => match source {
                SignInFailure::InvalidCredentials => "Incorrect email or password.".to_string(),
                SignInFailure::RateLimited { .. } => {
                    "Too many sign-in attempts. Please try again later.".to_string()
                }
                SignInFailure::Network(_) => {
                    "Unable to reach the sign-in service. Check your connection.".to_string()
                }
                SignInFailure::Service(_) => {
                    "Sign-in is temporarily unavailable. Please try again later.".to_string()
                }
            },
            Self::Cancelled { .. } => "Sign-in cancelled.".to_string(),
            Self::Misconfigured(_) => "Sign-in is unavailable.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_error_converts_to_rate_limited() {
        let err: LoginError = ThrottleError::RateLimitExceeded {
            identity: "a@example.com".into(),
            retry_after: Duration::from_secs(61),
        }
        .into();

        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(61)));
        assert_eq!(err.user_message(), "Too many failed attempts. Try again in 2 minutes.");
    }

    #[test]
    fn test_short_lockout_rounds_up_to_one_minute() {
        let err: LoginError = LoginError::RateLimited {
            identity: "a@example.com".into(),
            retry_after: Duration::from_secs(5),
        };
        assert_eq!(err.user_message(), "Too many failed attempts. Try again in 1 minute.");
    }

    #[test]
    fn test_retry_error_conversion_keeps_failure() {
        let err: LoginError = RetryError::Operation {
            source: SignInFailure::Network("reset".into()),
            attempts: 3,
        }
        .into();

        assert!(err.is_retryable());
        assert_eq!(err.sign_in_failure(), Some(&SignInFailure::Network("reset".into())));
        assert_eq!(err.to_string(), "Sign-in failed after 3 attempt(s)");
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let err: LoginError =
            RetryError::Cancelled { last_failure: SignInFailure::InvalidCredentials, attempts: 1 }
                .into();

        assert!(!err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert_eq!(err.user_message(), "Sign-in cancelled.");
    }

    #[test]
    fn test_user_message_for_invalid_credentials() {
        let err: LoginError =
            LoginError::SignIn { source: SignInFailure::InvalidCredentials, attempts: 1 };
        assert_eq!(err.user_message(), "Incorrect email or password.");
        assert_eq!(err.severity(), ErrorSeverity::Info);
    }
}
