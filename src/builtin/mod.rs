//! Built-in client implementations.
//!
//! - [`http`] (feature `http`): discovery-friendly HTTP client shell.

#[cfg(feature = "http")]
pub mod http;
