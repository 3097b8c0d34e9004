//! Shared test helpers for `loginguard-core` integration tests.
//!
//! Provides an in-memory authentication service so login tests can focus on
//! behaviour instead of boilerplate.

pub mod providers;
