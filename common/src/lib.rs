//! Shared building blocks for the Nellie webview bridge.
//!
//! This crate holds the pieces every other crate leans on: error location
//! capture for structured errors and secret handling for credentials that
//! cross the host/webview boundary.
//!
//! ## Architecture
//!
//! - **common** (this crate): error plumbing and secret wrappers
//! - **bridge-core**: messaging, transports and the bridge host
//! - **nellie-host**: the binary wiring everything together

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
