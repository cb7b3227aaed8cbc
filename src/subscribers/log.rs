//! # LogWriter - event renderer
//!
//! A minimal subscriber that renders incoming [`Event`]s through `tracing`.
//!
//! ## Example output
//! ```text
//! INFO client initialized client="httpclient" service="ip" endpoints=2
//! WARN client reinit failed client="httpclient" service="ip" endpoints=3 err="bad scheme"
//! INFO start barrier released
//! INFO service starting service="api"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let name = e.name.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ShutdownRequested => tracing::info!("shutdown requested"),
            EventKind::StartReleased => tracing::info!("start barrier released"),
            EventKind::ClientInitialized => tracing::info!(
                client = name,
                service = e.service.as_deref(),
                endpoints = e.endpoints,
                "client initialized"
            ),
            EventKind::ClientInitFailed => {
                tracing::error!(client = name, err = reason, "client init failed")
            }
            EventKind::ClientReinitialized => tracing::info!(
                client = name,
                service = e.service.as_deref(),
                endpoints = e.endpoints,
                "client reinitialized"
            ),
            EventKind::ClientReinitFailed => tracing::warn!(
                client = name,
                service = e.service.as_deref(),
                endpoints = e.endpoints,
                err = reason,
                "client reinit failed"
            ),
            EventKind::ClientShutdown => tracing::info!(client = name, "client shut down"),
            EventKind::ServicePrepared => tracing::debug!(service = name, "service prepared"),
            EventKind::ServicePrepareFailed => {
                tracing::error!(service = name, err = reason, "service prepare failed")
            }
            EventKind::ServiceStarting => tracing::info!(service = name, "service starting"),
            EventKind::ServiceStopped => tracing::info!(service = name, "service stopped"),
            EventKind::ServicePanicked => {
                tracing::error!(service = name, info = reason, "service panicked")
            }
            EventKind::ReporterFailed => {
                tracing::warn!(service = name, err = reason, "liveness reporter failed")
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = name, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = name, info = reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
