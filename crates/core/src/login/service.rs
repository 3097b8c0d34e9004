//! Login service - core business logic
//!
//! [`LoginGuard`] runs the sequence every login form needs: refuse locked-out
//! identities locally, retry the remote call with backoff, then report the
//! final outcome back to the attempt tracker.

use std::sync::Arc;

use loginguard_common::error::{ConfigError, ErrorClassification};
use loginguard_common::resilience::{
    normalize_identity, policies, AttemptState, AttemptTracker, BackoffRetrier, Clock,
    RetryDecision, RetryPlan, RetryPolicy, SystemClock, ThrottleConfig, ThrottleError,
};
use loginguard_domain::{Credentials, GuardConfig, GuardError, Session};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::LoginError;
use super::ports::{SignInFailure, SignInProvider};

/// Retry policy selected by `retry.stop_on_non_retryable`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignInRetryPolicy {
    /// Retry every failure until the attempt ceiling
    #[default]
    RetryAll,
    /// Stop on failures that classify as non-retryable, such as rejected
    /// credentials or a remote rate limit
    StopOnNonRetryable,
}

impl<E: ErrorClassification> RetryPolicy<E> for SignInRetryPolicy {
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        match self {
            Self::RetryAll => policies::AlwaysRetry.should_retry(error, attempt),
            Self::StopOnNonRetryable => policies::StopOnNonRetryable.should_retry(error, attempt),
        }
    }
}

/// Guarded sign-in: local throttle, remote call with backoff, outcome record
pub struct LoginGuard<P = SignInRetryPolicy, C: Clock = SystemClock> {
    provider: Arc<dyn SignInProvider>,
    tracker: AttemptTracker<C>,
    retrier: BackoffRetrier<P>,
}

impl LoginGuard<SignInRetryPolicy, SystemClock> {
    /// Build a guard from validated configuration using the system clock
    pub fn from_config(
        config: &GuardConfig,
        provider: Arc<dyn SignInProvider>,
    ) -> Result<Self, GuardError> {
        Self::from_config_with_clock(config, provider, SystemClock)
    }
}

impl<C: Clock> LoginGuard<SignInRetryPolicy, C> {
    /// Build a guard from configuration with a custom clock
    pub fn from_config_with_clock(
        config: &GuardConfig,
        provider: Arc<dyn SignInProvider>,
        clock: C,
    ) -> Result<Self, GuardError> {
        config.validate()?;

        let throttle = ThrottleConfig::builder()
            .max_failures(config.throttle.max_failures)
            .window(config.throttle.window())
            .lockout(config.throttle.lockout())
            .build()
            .map_err(config_error)?;
        let tracker = AttemptTracker::with_clock(throttle, clock).map_err(config_error)?;

        let mut plan =
            RetryPlan::new(config.retry.max_attempts, config.retry.base_delay()).map_err(config_error)?;
        if let Some(cap) = config.retry.max_delay() {
            plan = plan.with_max_delay(cap).map_err(config_error)?;
        }

        let policy = if config.retry.stop_on_non_retryable {
            SignInRetryPolicy::StopOnNonRetryable
        } else {
            SignInRetryPolicy::RetryAll
        };

        Ok(Self::new(provider, tracker, BackoffRetrier::with_policy(plan, policy)))
    }
}

fn config_error(err: ConfigError) -> GuardError {
    GuardError::Config(err.to_string())
}

impl<P, C> LoginGuard<P, C>
where
    P: RetryPolicy<SignInFailure>,
    C: Clock,
{
    /// Assemble a guard from prebuilt parts
    pub fn new(
        provider: Arc<dyn SignInProvider>,
        tracker: AttemptTracker<C>,
        retrier: BackoffRetrier<P>,
    ) -> Self {
        Self { provider, tracker, retrier }
    }

    /// Attempts left before a lockout, or the remaining lockout
    pub fn remaining_attempts(&self, identity: &str) -> Result<u32, ThrottleError> {
        self.tracker.check_allowed(identity)
    }

    /// Throttle state for display
    pub fn state(&self, identity: &str) -> AttemptState {
        self.tracker.state(identity)
    }

    /// The shared attempt tracker
    pub fn tracker(&self) -> &AttemptTracker<C> {
        &self.tracker
    }

    /// Sign in, retrying transient failures
    ///
    /// # Errors
    /// - [`LoginError::RateLimited`] when the identity is locked out; the
    ///   provider is not called
    /// - [`LoginError::SignIn`] carrying the provider's last failure
    #[instrument(skip_all, fields(identity = %normalize_identity(&credentials.identity)))]
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, LoginError> {
        self.guarded(credentials, None).await
    }

    /// Like [`sign_in`](Self::sign_in), but cancelling `token` abandons any
    /// pending backoff wait with [`LoginError::Cancelled`]
    #[instrument(skip_all, fields(identity = %normalize_identity(&credentials.identity)))]
    pub async fn sign_in_cancellable(
        &self,
        credentials: &Credentials,
        token: &CancellationToken,
    ) -> Result<Session, LoginError> {
        self.guarded(credentials, Some(token)).await
    }

    async fn guarded(
        &self,
        credentials: &Credentials,
        cancel: Option<&CancellationToken>,
    ) -> Result<Session, LoginError> {
        let remaining = self.tracker.check_allowed(&credentials.identity)?;
        debug!(remaining, "Sign-in permitted");

        let provider = &self.provider;
        let outcome = self.retrier.execute(|| provider.sign_in(credentials), cancel).await;

        // Cancellation still counts: at least one attempt reached the service.
        let succeeded = outcome.result.is_ok();
        self.tracker.record_outcome(&credentials.identity, succeeded);

        match outcome.result {
            Ok(session) => {
                info!(attempts = outcome.attempts, "Sign-in succeeded");
                Ok(session)
            }
            Err(err) => {
                let err = LoginError::from(err);
                warn!(attempts = outcome.attempts, error = %err, "Sign-in failed");
                Err(err)
            }
        }
    }
}

impl<P: Clone, C: Clock> Clone for LoginGuard<P, C> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            tracker: self.tracker.clone(),
            retrier: self.retrier.clone(),
        }
    }
}
