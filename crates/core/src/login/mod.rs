//! Login use case

pub mod errors;
pub mod ports;
pub mod service;

pub use errors::LoginError;
pub use ports::*;
pub use service::*;
