//! Port interfaces for sign-in
//!
//! These traits define the boundary between the login use case and the
//! remote authentication service adapter.

use std::time::Duration;

use async_trait::async_trait;
use loginguard_common::error::{ErrorClassification, ErrorSeverity};
use loginguard_domain::{Credentials, Session};
use thiserror::Error;

/// Remote authentication service
///
/// Implementations must tolerate being called repeatedly with the same
/// credentials; the login service retries failed calls.
#[async_trait]
pub trait SignInProvider: Send + Sync {
    /// Exchange credentials for a session
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, SignInFailure>;
}

/// Why the authentication service did not return a session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignInFailure {
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The remote service is throttling this identity or client
    #[error("Rate limited by authentication service")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication service error: {0}")]
    Service(String),
}

impl ErrorClassification for SignInFailure {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Service(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidCredentials => ErrorSeverity::Info,
            Self::RateLimited { .. } | Self::Network(_) => ErrorSeverity::Warning,
            Self::Service(_) => ErrorSeverity::Error,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
