//! # Event subscribers for the hostvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! an optional built-in [`LogWriter`] (feature `logging`).
//!
//! ## Architecture
//! ```text
//! Orchestrator / service tasks / watchers ── publish(Event) ──► Bus
//!                                                                │
//!                                                   subscriber_listener
//!                                                                │
//!                                                          SubscriberSet
//!                                                    ┌───────────┼───────────┐
//!                                                    ▼           ▼           ▼
//!                                                LogWriter    Metrics     Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub(crate) use set::panic_message;
pub use subscribe::Subscribe;
