//! Exponential backoff retry
//!
//! [`BackoffRetrier`] runs an asynchronous operation, retrying failures with a
//! doubling delay until the operation succeeds or the attempt ceiling is
//! reached. The final failure is handed back unchanged: callers need the
//! original cause, so there is no separate "attempts exhausted" error.
//!
//! The delay before attempt `n` (n >= 2) is `base_delay * 2^(n-2)`, without
//! jitter, optionally capped by [`RetryPlan::with_max_delay`].
//!
//! Waits between attempts can be cut short with a
//! [`CancellationToken`]. Cancellation suppresses the next attempt and returns
//! the last failure seen; the first attempt always runs.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{ConfigError, ConfigResult, ErrorClassification};

/// Errors surfaced by the cancellable and one-shot retry entry points
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The retry plan was invalid; nothing was executed
    #[error("Invalid retry plan: {0}")]
    InvalidPlan(#[from] ConfigError),

    /// The operation's last failure, unchanged
    #[error("Operation failed after {attempts} attempt(s)")]
    Operation { source: E, attempts: u32 },

    /// A wait between attempts was cancelled
    #[error("Retry cancelled after {attempts} attempt(s)")]
    Cancelled { last_failure: E, attempts: u32 },
}

impl<E> RetryError<E> {
    /// Extract the operation's last failure, if one was observed
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::InvalidPlan(_) => None,
            Self::Operation { source, .. } => Some(source),
            Self::Cancelled { last_failure, .. } => Some(last_failure),
        }
    }

    /// Number of times the operation ran
    pub fn attempts(&self) -> u32 {
        match self {
            Self::InvalidPlan(_) => 0,
            Self::Operation { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Attempt ceiling and delay schedule for one retry invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPlan {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Option<Duration>,
}

impl RetryPlan {
    /// Create a plan; `max_attempts` counts the first attempt
    ///
    /// # Errors
    /// [`ConfigError`] when `max_attempts` is zero.
    pub fn new(max_attempts: u32, base_delay: Duration) -> ConfigResult<Self> {
        if max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }
        Ok(Self { max_attempts, base_delay, max_delay: None })
    }

    /// Cap every computed delay at `max_delay`
    ///
    /// # Errors
    /// [`ConfigError`] when the cap is below the base delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> ConfigResult<Self> {
        if max_delay < self.base_delay {
            return Err(ConfigError::invalid("max_delay", "must not be below the base delay"));
        }
        self.max_delay = Some(max_delay);
        Ok(self)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Delay to wait before `attempt` (1-based). The first attempt never
    /// waits.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let delay = 1u32
            .checked_shl(attempt - 2)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Every delay the plan can produce, in order
    pub fn schedule(&self) -> Vec<Duration> {
        (2..=self.max_attempts).map(|attempt| self.delay_for(attempt)).collect()
    }
}

/// Decision for whether to retry after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait the scheduled delay, then try again
    Retry,
    /// Surface this failure now
    Stop,
}

/// Trait for determining whether a failure should be retried
pub trait RetryPolicy<E> {
    /// `attempt` is the 1-based number of the attempt that just failed
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Pre-defined retry policies
pub mod policies {
    use super::*;

    /// Retries every failure up to the attempt ceiling
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Stops as soon as a failure classifies itself as non-retryable, e.g. a
    /// rejection from an active remote lockout
    #[derive(Debug, Clone, Copy, Default)]
    pub struct StopOnNonRetryable;

    impl<E: ErrorClassification> RetryPolicy<E> for StopOnNonRetryable {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if error.is_retryable() {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug, Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}

use policies::AlwaysRetry;

/// Outcome of a retry execution including summary statistics
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    /// How many times the operation ran
    pub attempts: u32,
    /// Delays actually waited, in order
    pub delays: Vec<Duration>,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }

    pub fn was_cancelled(&self) -> bool {
        matches!(&self.result, Err(RetryError::Cancelled { .. }))
    }
}

/// Runs operations under a [`RetryPlan`]
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use loginguard_common::resilience::{BackoffRetrier, RetryPlan};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let retrier = BackoffRetrier::new(RetryPlan::new(3, Duration::from_millis(100))?);
///
/// let value = retrier.retry(|| async { Ok::<_, std::io::Error>(42) }).await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackoffRetrier<P = AlwaysRetry> {
    plan: RetryPlan,
    policy: P,
}

impl BackoffRetrier<AlwaysRetry> {
    /// Create a retrier that treats every failure as retryable
    pub fn new(plan: RetryPlan) -> Self {
        Self::with_policy(plan, AlwaysRetry)
    }
}

impl<P> BackoffRetrier<P> {
    /// Create a retrier with a custom retry policy
    pub fn with_policy(plan: RetryPlan, policy: P) -> Self {
        Self { plan, policy }
    }

    pub fn plan(&self) -> &RetryPlan {
        &self.plan
    }

    /// Run `operation` until it succeeds or the plan is exhausted, returning
    /// the first success or the last failure unchanged
    pub async fn retry<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.run(operation, None).await.finish {
            Finish::Succeeded(value) => Ok(value),
            Finish::Failed(error) | Finish::Cancelled(error) => Err(error),
        }
    }

    /// Like [`retry`](Self::retry), but a cancelled `token` aborts the
    /// pending wait and returns [`RetryError::Cancelled`]
    pub async fn retry_with_cancel<F, Fut, T, E>(
        &self,
        operation: F,
        token: &CancellationToken,
    ) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute(operation, Some(token)).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: F,
        cancel: Option<&CancellationToken>,
    ) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Run { finish, attempts, delays } = self.run(operation, cancel).await;
        let result = match finish {
            Finish::Succeeded(value) => Ok(value),
            Finish::Failed(source) => Err(RetryError::Operation { source, attempts }),
            Finish::Cancelled(last_failure) => Err(RetryError::Cancelled { last_failure, attempts }),
        };
        RetryOutcome { result, attempts, delays }
    }

    #[instrument(skip(self, operation, cancel), fields(max_attempts = self.plan.max_attempts))]
    async fn run<F, Fut, T, E>(
        &self,
        mut operation: F,
        cancel: Option<&CancellationToken>,
    ) -> Run<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delays = Vec::new();
        let mut attempt = 1;

        loop {
            debug!(attempt, "Executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retries");
                    }
                    return Run { finish: Finish::Succeeded(value), attempts: attempt, delays };
                }
                Err(error) => error,
            };

            if attempt >= self.plan.max_attempts {
                warn!(attempts = attempt, last_error = ?error, "All retry attempts exhausted");
                return Run { finish: Finish::Failed(error), attempts: attempt, delays };
            }

            if self.policy.should_retry(&error, attempt) == RetryDecision::Stop {
                debug!(attempt, error = ?error, "Retry policy stopped retrying");
                return Run { finish: Finish::Failed(error), attempts: attempt, delays };
            }

            let delay = self.plan.delay_for(attempt + 1);
            warn!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = ?error,
                "Operation failed, retrying"
            );

            if let Some(token) = cancel {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!(attempt, "Retry cancelled during backoff");
                        return Run { finish: Finish::Cancelled(error), attempts: attempt, delays };
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            } else {
                tokio::time::sleep(delay).await;
            }

            delays.push(delay);
            attempt += 1;
        }
    }
}

enum Finish<T, E> {
    Succeeded(T),
    Failed(E),
    Cancelled(E),
}

struct Run<T, E> {
    finish: Finish<T, E>,
    attempts: u32,
    delays: Vec<Duration>,
}

/// Convenience function: validate the plan inputs, then retry `operation`
/// with the default always-retry policy
///
/// # Errors
/// [`RetryError::InvalidPlan`] on misuse (`max_attempts == 0`), otherwise
/// [`RetryError::Operation`] carrying the last failure.
pub async fn retry<F, Fut, T, E>(
    max_attempts: u32,
    base_delay: Duration,
    operation: F,
) -> RetryResult<T, E>
where
    E: fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let plan = RetryPlan::new(max_attempts, base_delay)?;
    BackoffRetrier::new(plan).execute(operation, None).await.into_result()
}
