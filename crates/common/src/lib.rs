//! Modular common utilities shared across LoginGuard crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification and serde helpers
//! - `runtime`: clock abstraction, attempt tracking and backoff retry
//! - `observability`: tracing (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ConfigError, ConfigResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    retry, AttemptState, AttemptTracker, BackoffRetrier, Clock, MockClock,
    RetryDecision, RetryError, RetryOutcome, RetryPlan, RetryPolicy, SystemClock, ThrottleConfig,
    ThrottleError,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
