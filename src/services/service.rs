//! # Service capability.
//!
//! A service is started in two phases: [`Service::init`] runs during the orchestrator's
//! prepare phase, [`Service::run`] only once every service has been prepared.
//! The shared handle type is [`ServiceRef`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// # Long-running workload hosted by the orchestrator.
///
/// `run` is expected to block until the service's work is done or `ctx` is cancelled.
/// Cancellation is advisory: the orchestrator never aborts a running service, it waits.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use hostvisor::{Service, ServiceError};
///
/// struct Ticker;
///
/// #[async_trait]
/// impl Service for Ticker {
///     fn name(&self) -> &str { "ticker" }
///
///     async fn init(&self, _ctx: CancellationToken) -> Result<(), ServiceError> {
///         Ok(())
///     }
///
///     async fn run(&self, ctx: CancellationToken) {
///         ctx.cancelled().await;
///     }
///
///     async fn shutdown(&self, _ctx: CancellationToken) {}
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable service name.
    ///
    /// Also used as the reported service name when liveness reporting is enabled.
    fn name(&self) -> &str;

    /// Prepares the service; an error aborts the whole run before any service starts.
    async fn init(&self, ctx: CancellationToken) -> Result<(), ServiceError>;

    /// Runs the service's workload.
    async fn run(&self, ctx: CancellationToken);

    /// Called after `run` returns.
    async fn shutdown(&self, ctx: CancellationToken);
}

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;
