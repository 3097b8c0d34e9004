//! Mock sign-in provider implementations for testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use loginguard_core::{SignInFailure, SignInProvider};
use loginguard_domain::{Credentials, Session};
use parking_lot::Mutex;

/// In-memory authentication service.
///
/// Accepts registered identity/secret pairs and can be told to fail the next
/// `n` calls with a given failure to simulate an unreliable network.
#[derive(Default)]
pub struct InMemoryProvider {
    accounts: HashMap<String, String>,
    outages: Mutex<Vec<SignInFailure>>,
    calls: AtomicU32,
}

impl InMemoryProvider {
    /// Create a provider knowing a single account.
    pub fn with_account(identity: &str, secret: &str) -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(identity.to_string(), secret.to_string());
        Self { accounts, ..Self::default() }
    }

    /// Fail the next `count` calls with `failure` before consulting accounts.
    pub fn fail_next(self, count: usize, failure: SignInFailure) -> Self {
        self.outages.lock().extend(std::iter::repeat(failure).take(count));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of times the service was contacted.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignInProvider for InMemoryProvider {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, SignInFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = self.outages.lock().pop() {
            return Err(failure);
        }

        match self.accounts.get(&credentials.identity) {
            Some(secret) if secret == credentials.secret() => Ok(Session {
                identity: credentials.identity.clone(),
                access_token: format!("token-for-{}", credentials.identity),
                expires_in: Some(3600),
            }),
            _ => Err(SignInFailure::InvalidCredentials),
        }
    }
}
