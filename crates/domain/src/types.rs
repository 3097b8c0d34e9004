//! Sign-in data types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{GuardError, Result};

/// What the user submitted on the login form
///
/// The secret never appears in `Debug` output. Deserialization goes through
/// [`Credentials::new`], so a blank identity is rejected there too.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CredentialsForm")]
pub struct Credentials {
    pub identity: String,
    secret: String,
}

impl Credentials {
    /// Build credentials from form input
    ///
    /// # Errors
    /// [`GuardError::InvalidInput`] when the identity is blank.
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(GuardError::InvalidInput("identity must not be empty".to_string()));
        }
        Ok(Self { identity, secret: secret.into() })
    }

    /// The secret to forward to the authentication service
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

#[derive(Deserialize)]
struct CredentialsForm {
    identity: String,
    secret: String,
}

impl TryFrom<CredentialsForm> for Credentials {
    type Error = GuardError;

    fn try_from(form: CredentialsForm) -> Result<Self> {
        Self::new(form.identity, form.secret)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Authenticated session returned by the authentication service
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: String,
    pub access_token: String,
    /// Lifetime in seconds, when the service reports one
    pub expires_in: Option<u64>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_identity_rejected() {
        assert!(matches!(Credentials::new("   ", "pw"), Err(GuardError::InvalidInput(_))));
        assert!(Credentials::new("a@example.com", "").is_ok());
    }

    #[test]
    fn test_deserialize_validates_identity() {
        let credentials: Credentials =
            serde_json::from_str(r#"{"identity":"a@example.com","secret":"pw"}"#).unwrap();
        assert_eq!(credentials, Credentials::new("a@example.com", "pw").unwrap());

        let blank = serde_json::from_str::<Credentials>(r#"{"identity":"  ","secret":"pw"}"#);
        let err = blank.unwrap_err();
        assert!(err.to_string().contains("identity must not be empty"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credentials = Credentials::new("a@example.com", "hunter2").unwrap();
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("a@example.com"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(credentials.secret(), "hunter2");

        let session = Session {
            identity: "a@example.com".into(),
            access_token: "tok-123".into(),
            expires_in: Some(3600),
        };
        assert!(!format!("{session:?}").contains("tok-123"));
    }
}
