//! # Coordination-store contracts.
//!
//! The orchestrator never talks to a discovery/configuration store directly. It consumes
//! the store through these traits:
//!
//! ```text
//! Cluster ──► new_broker(service)   ──► Broker ──► getenv / endpoints / watch(BrokerWatcher)
//!        └──► new_reporter(service) ──► Reporter ──► keepalive / close
//! ```
//!
//! - A [`Broker`] is a per-service-name handle: a key/value environment plus an endpoint
//!   membership set, both of which may change at any time.
//! - A [`BrokerWatcher`] is notified of every change after it was registered.
//! - A [`Reporter`] advertises a running service (liveness heartbeat) until closed.
//!
//! [`MemoryCluster`] is an in-process implementation used by tests, demos and local
//! development.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ClusterError;

pub use memory::{MemoryBroker, MemoryCluster, MemoryReporter, ReporterCall};

/// One addressable backend instance.
///
/// Identity is `id`: the address of an instance may change while its ID stays the same,
/// and a new ID may reuse an old address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Stable endpoint identity.
    pub id: String,
    /// Network address (`host:port`).
    pub addr: String,
    /// Selection weight used by external balancers.
    pub weight: u32,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(id: impl Into<String>, addr: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            addr: addr.into(),
            weight,
        }
    }

    /// True if `addr` and `weight` match (identity is not compared).
    #[inline]
    pub fn same_target(&self, other: &Endpoint) -> bool {
        self.addr == other.addr && self.weight == other.weight
    }
}

/// Handle to the coordination store.
#[async_trait]
pub trait Cluster: Send + Sync + 'static {
    /// Human-readable cluster name.
    fn name(&self) -> &str;

    /// Opens a broker for `service`.
    async fn new_broker(&self, service: &str) -> Result<Arc<dyn Broker>, ClusterError>;

    /// Creates a liveness reporter for `service`.
    async fn new_reporter(&self, service: &str) -> Result<Arc<dyn Reporter>, ClusterError>;
}

/// Per-service-name handle into the coordination store.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Service name this broker is bound to.
    fn service_name(&self) -> &str;

    /// Returns the current value of `key`, `None` if unset.
    async fn getenv(&self, key: &str) -> Result<Option<String>, ClusterError>;

    /// Returns the current endpoint membership snapshot.
    async fn endpoints(&self) -> Result<Vec<Endpoint>, ClusterError>;

    /// Registers `watcher`; it observes every change made after this call.
    async fn watch(&self, watcher: Arc<dyn BrokerWatcher>);
}

/// Observer of broker changes.
///
/// Callbacks are awaited by the broker's delivery mechanism; an implementation may apply
/// backpressure by awaiting.
#[async_trait]
pub trait BrokerWatcher: Send + Sync + 'static {
    /// `key` was set to `value`.
    async fn on_setenv(&self, key: &str, value: &str);

    /// `key` was deleted.
    async fn on_delenv(&self, key: &str);

    /// `endpoint` joined or changed.
    async fn on_update_endpoint(&self, endpoint: Endpoint);

    /// The endpoint with `id` left.
    async fn on_delete_endpoint(&self, id: &str);
}

/// Liveness reporter for one running service.
#[async_trait]
pub trait Reporter: Send + Sync + 'static {
    /// Advertises `addr` with `weight`; the registration expires after `ttl` seconds
    /// unless refreshed by the store's own keepalive loop.
    async fn keepalive(&self, addr: &str, weight: u32, ttl: u64) -> Result<(), ClusterError>;

    /// Withdraws the registration.
    async fn close(&self, ctx: CancellationToken);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_target_ignores_identity() {
        let a = Endpoint::new("e1", "10.0.0.1:80", 100);
        let b = Endpoint::new("e2", "10.0.0.1:80", 100);
        let c = Endpoint::new("e1", "10.0.0.1:80", 50);
        assert!(a.same_target(&b));
        assert!(!a.same_target(&c));
    }
}
