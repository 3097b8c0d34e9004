//! Resilience patterns for login flows
//!
//! This module provides the two building blocks a login form composes:
//! - **Attempt tracking**: per-identity sliding window of failed attempts with
//!   a lockout once a threshold is reached
//! - **Backoff retry**: re-run a failing asynchronous operation with
//!   exponentially growing delay up to an attempt ceiling
//!
//! Both are generic (no knowledge of what an identity or a session is) and
//! testable through the [`Clock`] abstraction and tokio's paused time.
//!
//! A caller typically runs:
//!
//! 1. [`AttemptTracker::check_allowed`] before contacting the remote service
//! 2. [`BackoffRetrier::retry`] around the remote sign-in call
//! 3. [`AttemptTracker::record_outcome`] with the final result

pub mod attempt_tracker;
pub mod clock;
pub mod retry;

pub use attempt_tracker::{
    normalize_identity, AttemptState, AttemptTracker, ThrottleConfig, ThrottleConfigBuilder,
    ThrottleError, MAX_LOCKOUT,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use retry::{
    policies, retry, BackoffRetrier, RetryDecision, RetryError, RetryOutcome, RetryPlan,
    RetryPolicy, RetryResult,
};
