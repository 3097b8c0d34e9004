//! # LoginGuard Infrastructure
//!
//! Impure edges of the login guard.
//!
//! This crate contains:
//! - Configuration loading from environment variables and files
//! - Tracing subscriber installation
//!
//! ## Architecture
//! - Depends on `loginguard-domain` for the configuration model
//! - Contains all "impure" code (environment, filesystem, global subscriber)

pub mod config;
pub mod observability;

// Re-export commonly used items
pub use config::{load, load_from_env, load_from_file, probe_config_paths};
pub use observability::{init_tracing, LOG_FILTER_ENV};
