//! Per-identity login attempt throttling
//!
//! [`AttemptTracker`] keeps a sliding window of failed attempts for every
//! identity and locks the identity out once the window holds `max_failures`
//! failures. It is a local first line of defense only; the remote
//! authentication service remains the enforcing authority.
//!
//! Per identity the tracker moves through:
//!
//! ```text
//! Clear ──failure──▶ Accumulating(1..max-1) ──max-th failure──▶ Locked
//!   ▲                        │                                     │
//!   └────────success─────────┴──────────expiry or success──────────┘
//! ```
//!
//! Stale failures are pruned lazily whenever a record is read or written.
//!
//! # Concurrency
//!
//! Every read-modify-write of a record happens under one mutex. The
//! `check_allowed` then `record_outcome` sequence spans two lock acquisitions,
//! so concurrent submissions for the same identity can be granted one extra
//! attempt. That race is accepted: the remote service enforces the real limit.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{Clock, SystemClock};
use crate::error::{ConfigError, ConfigResult, ErrorClassification, ErrorSeverity};
use crate::utils::serde::duration_millis;

/// Default number of failures that triggers a lockout
pub const DEFAULT_MAX_FAILURES: u32 = 5;
/// Default sliding window over which failures count
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);
/// Default lockout length
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(15 * 60);
/// Longest lockout a configuration may request
pub const MAX_LOCKOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration for [`AttemptTracker`], fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Failures inside the window that trigger a lockout
    pub max_failures: u32,
    /// Sliding window, measured backward from now, in which failures count
    pub window: Duration,
    /// How long a lockout lasts once triggered
    pub lockout: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { max_failures: DEFAULT_MAX_FAILURES, window: DEFAULT_WINDOW, lockout: DEFAULT_LOCKOUT }
    }
}

impl ThrottleConfig {
    /// Create a new configuration builder
    pub fn builder() -> ThrottleConfigBuilder {
        ThrottleConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_failures == 0 {
            return Err(ConfigError::invalid("max_failures", "must be greater than 0"));
        }
        if self.window.is_zero() {
            return Err(ConfigError::invalid("window", "must be greater than zero"));
        }
        if self.lockout.is_zero() {
            return Err(ConfigError::invalid("lockout", "must be greater than zero"));
        }
        if self.lockout > MAX_LOCKOUT {
            return Err(ConfigError::invalid(
                "lockout",
                format!("must not exceed {} seconds", MAX_LOCKOUT.as_secs()),
            ));
        }
        Ok(())
    }
}

/// Builder for ThrottleConfig
#[derive(Debug, Default)]
pub struct ThrottleConfigBuilder {
    config: ThrottleConfig,
}

impl ThrottleConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_failures(mut self, max_failures: u32) -> Self {
        self.config.max_failures = max_failures;
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    pub fn lockout(mut self, lockout: Duration) -> Self {
        self.config.lockout = lockout;
        self
    }

    pub fn build(self) -> ConfigResult<ThrottleConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Local throttle rejection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottleError {
    /// The identity is locked out until `retry_after` has elapsed
    #[error("Too many failed attempts for '{identity}', retry after {retry_after:?}")]
    RateLimitExceeded { identity: String, retry_after: Duration },
}

impl ThrottleError {
    /// Remaining lockout time
    pub fn remaining(&self) -> Duration {
        match self {
            Self::RateLimitExceeded { retry_after, .. } => *retry_after,
        }
    }
}

impl ErrorClassification for ThrottleError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }

    fn retry_after(&self) -> Option<Duration> {
        Some(self.remaining())
    }
}

/// Read-only view of an identity's throttle state, suitable for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptState {
    /// No failures inside the window and no lock
    Clear,
    /// Some failures inside the window, below the threshold
    Accumulating { failures: u32, remaining: u32 },
    /// Attempts are refused until the lock expires
    Locked {
        #[serde(with = "duration_millis")]
        retry_after: Duration,
    },
}

#[derive(Debug, Default)]
struct AttemptRecord {
    /// Oldest first
    failures: VecDeque<Instant>,
    locked_until: Option<Instant>,
}

impl AttemptRecord {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.failures.front() {
            if now.saturating_duration_since(*oldest) < window {
                break;
            }
            self.failures.pop_front();
        }
    }

    /// Remaining lock time, or `None` when unlocked. An expired lock is
    /// cleared together with the failures it superseded.
    fn active_lock(&mut self, now: Instant) -> Option<Duration> {
        let until = self.locked_until?;
        if now < until {
            return Some(until - now);
        }
        self.locked_until = None;
        self.failures.clear();
        None
    }

    fn failure_count(&self) -> u32 {
        u32::try_from(self.failures.len()).unwrap_or(u32::MAX)
    }

    fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.locked_until.is_none()
    }
}

/// `now + span`, shortened to the latest representable instant on overflow
fn saturating_deadline(now: Instant, span: Duration) -> Instant {
    let mut span = span;
    loop {
        if let Some(deadline) = now.checked_add(span) {
            return deadline;
        }
        span /= 2;
    }
}

/// Normalize an identity into its tracking key (trimmed, lowercased)
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Per-identity login attempt tracker
///
/// Clones share the same underlying state.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use loginguard_common::resilience::{AttemptTracker, MockClock, ThrottleConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ThrottleConfig::builder()
///     .max_failures(3)
///     .window(Duration::from_secs(60))
///     .lockout(Duration::from_secs(300))
///     .build()?;
/// let tracker = AttemptTracker::with_clock(config, MockClock::new())?;
///
/// assert_eq!(tracker.check_allowed("Alice@Example.com")?, 3);
/// tracker.record_outcome("alice@example.com", false);
/// assert_eq!(tracker.check_allowed(" ALICE@example.com ")?, 2);
/// # Ok(())
/// # }
/// ```
pub struct AttemptTracker<C: Clock = SystemClock> {
    config: ThrottleConfig,
    records: Arc<Mutex<HashMap<String, AttemptRecord>>>,
    clock: Arc<C>,
}

impl AttemptTracker<SystemClock> {
    /// Create a tracker backed by the system clock
    pub fn new(config: ThrottleConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> AttemptTracker<C> {
    /// Create a tracker with a custom clock
    pub fn with_clock(config: ThrottleConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config, records: Arc::new(Mutex::new(HashMap::new())), clock: Arc::new(clock) })
    }

    /// The configuration this tracker was built with
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Decide whether a new attempt is permitted for `identity`.
    ///
    /// Returns the number of failures still allowed before a lockout. Zero
    /// means the next failure locks the identity. Apart from pruning stale
    /// history this call has no effect, so it is safe to poll.
    ///
    /// # Errors
    /// [`ThrottleError::RateLimitExceeded`] while a lock is active.
    pub fn check_allowed(&self, identity: &str) -> Result<u32, ThrottleError> {
        let key = normalize_identity(identity);
        let now = self.clock.now();
        let mut records = self.records.lock();

        let Some(record) = records.get_mut(&key) else {
            return Ok(self.config.max_failures);
        };

        record.prune(now, self.config.window);
        if let Some(retry_after) = record.active_lock(now) {
            debug!(
                identity = %key,
                retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                "Attempt refused, identity locked"
            );
            return Err(ThrottleError::RateLimitExceeded { identity: key, retry_after });
        }

        let remaining = self.config.max_failures.saturating_sub(record.failure_count());
        if record.is_empty() {
            records.remove(&key);
        }
        Ok(remaining)
    }

    /// Report the outcome of an attempt for `identity`.
    ///
    /// Success forgets the identity entirely. Failure appends to the window
    /// and locks the identity once the window holds `max_failures` failures;
    /// the lock then replaces the accumulated failures. A failure reported
    /// while a lock is still active does not extend it.
    pub fn record_outcome(&self, identity: &str, succeeded: bool) {
        let key = normalize_identity(identity);
        let mut records = self.records.lock();

        if succeeded {
            if records.remove(&key).is_some() {
                debug!(identity = %key, "Attempt history cleared after success");
            }
            return;
        }

        let now = self.clock.now();
        let record = records.entry(key).or_default();
        record.prune(now, self.config.window);
        if record.active_lock(now).is_some() {
            return;
        }

        record.failures.push_back(now);
        if record.failure_count() >= self.config.max_failures {
            record.failures.clear();
            record.locked_until = Some(saturating_deadline(now, self.config.lockout));
            warn!(
                max_failures = self.config.max_failures,
                lockout_secs = self.config.lockout.as_secs(),
                "Failure threshold reached, identity locked"
            );
        } else {
            debug!(failures = record.failure_count(), "Failed attempt recorded");
        }
    }

    /// Shorthand for `record_outcome(identity, true)`
    pub fn record_success(&self, identity: &str) {
        self.record_outcome(identity, true);
    }

    /// Shorthand for `record_outcome(identity, false)`
    pub fn record_failure(&self, identity: &str) {
        self.record_outcome(identity, false);
    }

    /// Current throttle state of `identity`
    pub fn state(&self, identity: &str) -> AttemptState {
        let key = normalize_identity(identity);
        let now = self.clock.now();
        let mut records = self.records.lock();

        let Some(record) = records.get_mut(&key) else {
            return AttemptState::Clear;
        };
        record.prune(now, self.config.window);
        if let Some(retry_after) = record.active_lock(now) {
            return AttemptState::Locked { retry_after };
        }
        match record.failure_count() {
            0 => AttemptState::Clear,
            failures => AttemptState::Accumulating {
                failures,
                remaining: self.config.max_failures.saturating_sub(failures),
            },
        }
    }

    /// Forget everything recorded for `identity`. Returns whether a record
    /// existed.
    pub fn reset(&self, identity: &str) -> bool {
        self.records.lock().remove(&normalize_identity(identity)).is_some()
    }

    /// Drop records whose lock has expired and whose window is empty.
    /// Returns the number of records removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.window;
        let mut records = self.records.lock();
        let before = records.len();

        records.retain(|_, record| {
            record.prune(now, window);
            record.active_lock(now);
            !record.is_empty()
        });

        let evicted = before - records.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired attempt records");
        }
        evicted
    }

    /// Number of identities currently holding a record
    pub fn tracked_identities(&self) -> usize {
        self.records.lock().len()
    }
}

impl<C: Clock> Clone for AttemptTracker<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            records: Arc::clone(&self.records),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock> std::fmt::Debug for AttemptTracker<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptTracker")
            .field("config", &self.config)
            .field("tracked_identities", &self.tracked_identities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::MockClock;
    use super::*;

    fn tracker(max_failures: u32, window_mins: u64, lockout_mins: u64) -> (AttemptTracker<MockClock>, MockClock) {
        let clock = MockClock::new();
        let config = ThrottleConfig::builder()
            .max_failures(max_failures)
            .window(Duration::from_secs(window_mins * 60))
            .lockout(Duration::from_secs(lockout_mins * 60))
            .build()
            .unwrap();
        (AttemptTracker::with_clock(config, clock.clone()).unwrap(), clock)
    }

    #[test]
    fn test_unknown_identity_has_full_allowance() {
        let (tracker, _) = tracker(5, 15, 15);
        assert_eq!(tracker.check_allowed("nobody@example.com"), Ok(5));
        assert_eq!(tracker.tracked_identities(), 0);
    }

    #[test]
    fn test_failures_reduce_allowance_down_to_zero() {
        let (tracker, _) = tracker(3, 15, 15);

        tracker.record_failure("a@example.com");
        assert_eq!(tracker.check_allowed("a@example.com"), Ok(2));

        tracker.record_failure("a@example.com");
        assert_eq!(tracker.check_allowed("a@example.com"), Ok(1));
        assert_eq!(
            tracker.state("a@example.com"),
            AttemptState::Accumulating { failures: 2, remaining: 1 }
        );
    }

    #[test]
    fn test_threshold_failure_locks_identity() {
        let (tracker, clock) = tracker(5, 15, 15);

        for _ in 0..5 {
            clock.advance(Duration::from_secs(10));
            tracker.record_failure("a@example.com");
        }

        let err = tracker.check_allowed("a@example.com").unwrap_err();
        let ThrottleError::RateLimitExceeded { identity, retry_after } = err;
        assert_eq!(identity, "a@example.com");
        assert_eq!(retry_after, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_lock_reports_shrinking_remaining_time() {
        let (tracker, clock) = tracker(1, 15, 10);
        tracker.record_failure("a@example.com");

        clock.advance_mins(4);
        let err = tracker.check_allowed("a@example.com").unwrap_err();
        assert_eq!(err.remaining(), Duration::from_secs(6 * 60));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(6 * 60)));
    }

    #[test]
    fn test_lock_expiry_restores_full_allowance() {
        let (tracker, clock) = tracker(2, 15, 10);
        tracker.record_failure("a@example.com");
        tracker.record_failure("a@example.com");
        assert!(tracker.check_allowed("a@example.com").is_err());

        clock.advance_mins(10);

        assert_eq!(tracker.check_allowed("a@example.com"), Ok(2));
        assert_eq!(tracker.state("a@example.com"), AttemptState::Clear);
    }

    #[test]
    fn test_success_resets_history_and_lock() {
        let (tracker, _) = tracker(2, 15, 10);
        tracker.record_failure("a@example.com");
        tracker.record_failure("a@example.com");
        assert!(tracker.check_allowed("a@example.com").is_err());

        tracker.record_success("a@example.com");

        assert_eq!(tracker.check_allowed("a@example.com"), Ok(2));
        assert_eq!(tracker.tracked_identities(), 0);
    }

    #[test]
    fn test_window_slides_past_old_failures() {
        let (tracker, clock) = tracker(5, 15, 15);
        for _ in 0..4 {
            tracker.record_failure("a@example.com");
        }

        clock.advance_mins(20);
        tracker.record_failure("a@example.com");

        assert_eq!(tracker.check_allowed("a@example.com"), Ok(4));
    }

    #[test]
    fn test_failure_exactly_one_window_old_is_stale() {
        let (tracker, clock) = tracker(3, 15, 15);
        tracker.record_failure("a@example.com");

        clock.advance_mins(15);

        assert_eq!(tracker.check_allowed("a@example.com"), Ok(3));
    }

    #[test]
    fn test_identity_is_normalized() {
        let (tracker, _) = tracker(3, 15, 15);
        tracker.record_failure("  Alice@Example.COM ");

        assert_eq!(tracker.check_allowed("alice@example.com"), Ok(2));
        assert!(tracker.reset("ALICE@EXAMPLE.COM"));
    }

    #[test]
    fn test_empty_identity_is_a_valid_key() {
        let (tracker, _) = tracker(1, 15, 15);
        tracker.record_failure("   ");

        assert!(tracker.check_allowed("").is_err());
        assert_eq!(tracker.check_allowed("someone"), Ok(1));
    }

    #[test]
    fn test_check_allowed_is_idempotent() {
        let (tracker, _) = tracker(4, 15, 15);
        tracker.record_failure("a@example.com");

        for _ in 0..10 {
            assert_eq!(tracker.check_allowed("a@example.com"), Ok(3));
        }
    }

    #[test]
    fn test_failure_during_active_lock_does_not_extend_it() {
        let (tracker, clock) = tracker(1, 15, 10);
        tracker.record_failure("a@example.com");

        clock.advance_mins(5);
        tracker.record_failure("a@example.com");

        assert_eq!(
            tracker.check_allowed("a@example.com").unwrap_err().remaining(),
            Duration::from_secs(5 * 60)
        );
    }

    #[test]
    fn test_failure_after_expired_lock_starts_fresh_window() {
        let (tracker, clock) = tracker(3, 15, 10);
        for _ in 0..3 {
            tracker.record_failure("a@example.com");
        }

        clock.advance_mins(11);
        tracker.record_failure("a@example.com");

        assert_eq!(tracker.check_allowed("a@example.com"), Ok(2));
    }

    #[test]
    fn test_evict_expired_keeps_live_records() {
        let (tracker, clock) = tracker(2, 15, 10);
        tracker.record_failure("locked@example.com");
        tracker.record_failure("locked@example.com");
        tracker.record_failure("stale@example.com");

        clock.advance_mins(16);
        tracker.record_failure("fresh@example.com");

        assert_eq!(tracker.evict_expired(), 2);
        assert_eq!(tracker.tracked_identities(), 1);
        assert_eq!(tracker.check_allowed("fresh@example.com"), Ok(1));
    }

    #[test]
    fn test_clones_share_state() {
        let (tracker, _) = tracker(3, 15, 15);
        let other = tracker.clone();

        other.record_failure("a@example.com");

        assert_eq!(tracker.check_allowed("a@example.com"), Ok(2));
    }

    #[test]
    fn test_attempt_state_serializes_for_display() {
        let locked = AttemptState::Locked { retry_after: Duration::from_secs(30) };
        let json = serde_json::to_string(&locked).unwrap();
        assert_eq!(json, r#"{"state":"locked","retry_after":30000}"#);

        let clear = serde_json::to_string(&AttemptState::Clear).unwrap();
        assert_eq!(clear, r#"{"state":"clear"}"#);
    }

    #[test]
    fn test_throttle_config_validation() {
        assert!(ThrottleConfig::builder().max_failures(0).build().is_err());
        assert!(ThrottleConfig::builder().window(Duration::ZERO).build().is_err());
        assert!(ThrottleConfig::builder().lockout(Duration::ZERO).build().is_err());
        assert_eq!(ThrottleConfig::builder().build(), Ok(ThrottleConfig::default()));
    }

    #[test]
    fn test_oversized_lockout_rejected() {
        let err = ThrottleConfig::builder().lockout(Duration::MAX).build().unwrap_err();
        assert_eq!(err.field(), "lockout");

        assert!(ThrottleConfig::builder().lockout(MAX_LOCKOUT).build().is_ok());
        assert!(ThrottleConfig::builder()
            .lockout(MAX_LOCKOUT + Duration::from_secs(1))
            .build()
            .is_err());
    }

    #[test]
    fn test_longest_lockout_locks_without_overflow() {
        let (tracker, clock) = tracker(1, 15, MAX_LOCKOUT.as_secs() / 60);
        tracker.record_failure("a@example.com");

        clock.advance_mins(60);
        let err = tracker.check_allowed("a@example.com").unwrap_err();
        assert_eq!(err.remaining(), MAX_LOCKOUT - Duration::from_secs(60 * 60));
    }

    #[test]
    fn test_saturating_deadline_never_overflows() {
        let now = Instant::now();
        assert_eq!(saturating_deadline(now, Duration::from_secs(60)), now + Duration::from_secs(60));

        let far = saturating_deadline(now, Duration::MAX);
        assert!(far > now);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = ThrottleConfig { max_failures: 0, ..ThrottleConfig::default() };
        let err = AttemptTracker::new(config).unwrap_err();
        assert_eq!(err.field(), "max_failures");
    }
}
