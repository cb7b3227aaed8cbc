//! # Runtime events emitted by the orchestrator, services and discovery watchers.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Client events**: initialization, discovery-driven reconfiguration, shutdown
//! - **Service events**: prepare, start barrier, run, stop
//! - **Runtime events**: shutdown requests and subscriber health
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the client or
//! service name, reasons and the endpoint count of a reconfiguration.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use hostvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ClientReinitFailed)
//!     .with_name("httpclient")
//!     .with_reason("connection refused")
//!     .with_endpoints(3);
//!
//! assert_eq!(ev.kind, EventKind::ClientReinitFailed);
//! assert_eq!(ev.name.as_deref(), Some("httpclient"));
//! assert_eq!(ev.endpoints, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `name` (subscriber) and `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `name` (subscriber) and `reason`.
    SubscriberOverflow,

    // === Runtime events ===
    /// Shutdown requested (OS signal observed); the run context is cancelled.
    ShutdownRequested,

    /// Every service was prepared and the start barrier was released.
    StartReleased,

    // === Client events ===
    /// Client initialized (static or discovery-bound).
    ///
    /// Sets `name`; `service` and `endpoints` for discovery-bound clients.
    ClientInitialized,

    /// Client initialization failed; the run is aborted.
    ///
    /// Sets `name` and `reason`.
    ClientInitFailed,

    /// Discovery watcher applied a new configuration snapshot.
    ///
    /// Sets `name`, `service`, `endpoints`.
    ClientReinitialized,

    /// The client rejected a discovery-driven configuration snapshot.
    ///
    /// The watcher keeps the new snapshot cached. Sets `name`, `service`, `endpoints`, `reason`.
    ClientReinitFailed,

    /// Client shut down during teardown.
    ClientShutdown,

    // === Service events ===
    /// Service `init` succeeded; its task waits on the start barrier.
    ServicePrepared,

    /// Service `init` failed; the run is aborted.
    ///
    /// Sets `name` and `reason`.
    ServicePrepareFailed,

    /// Service passed the start barrier and is entering `run`.
    ServiceStarting,

    /// Service `run` returned and the service was shut down.
    ServiceStopped,

    /// Service task panicked.
    ///
    /// Sets `name` and `reason`.
    ServicePanicked,

    /// Liveness reporting could not be set up or refreshed; the service keeps running.
    ///
    /// Sets `name` and `reason`.
    ReporterFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Client, service or subscriber name, if applicable.
    pub name: Option<Arc<str>>,
    /// Discovery service name the client is bound to.
    pub service: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Number of endpoints in the applied configuration snapshot.
    pub endpoints: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            name: None,
            service: None,
            reason: None,
            endpoints: None,
        }
    }

    /// Attaches a client/service/subscriber name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches the discovery service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an endpoint count (saturates at `u32::MAX`).
    #[inline]
    pub fn with_endpoints(mut self, n: usize) -> Self {
        self.endpoints = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_name(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_name(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ClientInitialized);
        let b = Event::new(EventKind::ClientShutdown);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn overflow_event_carries_subscriber_name() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_event());
        assert_eq!(ev.name.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
    }
}
