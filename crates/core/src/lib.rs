//! # LoginGuard Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The sign-in port implemented by authentication adapters
//! - The login use case composing attempt throttling and backoff retry
//!
//! ## Architecture Principles
//! - Only depends on `loginguard-common` and `loginguard-domain`
//! - No HTTP or platform code
//! - The authentication service is reached through a trait
//! - Pure, testable business logic

pub mod login;

pub use login::ports::{SignInFailure, SignInProvider};
pub use login::{LoginError, LoginGuard, SignInRetryPolicy};
