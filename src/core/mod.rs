//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Orchestrator`] (with its builder), the
//! [`StartBarrier`] primitive and the [`Overview`] snapshot.
//!
//! Internal modules:
//! - [`orchestrator`]: phases of a run and teardown;
//! - [`lifecycle`]: prepare and gated run of one service, liveness reporting;
//! - [`barrier`]: one-shot start barrier;
//! - [`shutdown`]: OS signal listener;
//! - [`overview`]: printable snapshot of clients and services;
//! - [`builder`]: orchestrator construction.

mod barrier;
mod builder;
mod lifecycle;
mod orchestrator;
mod overview;
mod shutdown;

pub use barrier::StartBarrier;
pub use builder::OrchestratorBuilder;
pub use orchestrator::Orchestrator;
pub use overview::{Overview, OverviewRow};
