//! # In-process coordination store.
//!
//! [`MemoryCluster`] keeps one [`MemoryBroker`] per service name and one
//! [`MemoryReporter`] per reported service. Mutations on a broker are delivered to every
//! registered watcher in call order, **including redundant ones** (an endpoint update with
//! an unchanged address/weight is still broadcast), which mirrors how real membership
//! stores re-announce instances.
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use hostvisor::{Endpoint, MemoryCluster};
//!
//! let cluster = MemoryCluster::new("local");
//! let broker = cluster.broker("ip");
//! broker.setenv("options", r#"{"scheme":"http"}"#).await;
//! broker.update_endpoint(Endpoint::new("n1", "127.0.0.1:9001", 50)).await;
//! assert_eq!(broker.endpoint_count(), 1);
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Broker, BrokerWatcher, Cluster, Endpoint, Reporter};
use crate::error::ClusterError;

/// In-process [`Cluster`].
pub struct MemoryCluster {
    name: String,
    brokers: Mutex<HashMap<String, Arc<MemoryBroker>>>,
    reporters: Mutex<HashMap<String, Arc<MemoryReporter>>>,
    unavailable: Mutex<Option<String>>,
}

impl MemoryCluster {
    /// Creates an empty cluster.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            brokers: Mutex::new(HashMap::new()),
            reporters: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(None),
        })
    }

    /// Returns the broker for `service`, creating it if needed.
    pub fn broker(&self, service: &str) -> Arc<MemoryBroker> {
        lock(&self.brokers)
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(MemoryBroker::new(service)))
            .clone()
    }

    /// Returns the reporter created for `service`, if any.
    pub fn reporter(&self, service: &str) -> Option<Arc<MemoryReporter>> {
        lock(&self.reporters).get(service).cloned()
    }

    /// Makes every subsequent `new_broker`/`new_reporter` fail with `reason`
    /// (`None` restores availability).
    pub fn set_unavailable(&self, reason: Option<&str>) {
        *lock(&self.unavailable) = reason.map(str::to_string);
    }

    fn check_available(&self) -> Result<(), ClusterError> {
        match lock(&self.unavailable).as_deref() {
            Some(reason) => Err(ClusterError::Unavailable {
                error: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Cluster for MemoryCluster {
    fn name(&self) -> &str {
        &self.name
    }

    async fn new_broker(&self, service: &str) -> Result<Arc<dyn Broker>, ClusterError> {
        self.check_available()?;
        Ok(self.broker(service))
    }

    async fn new_reporter(&self, service: &str) -> Result<Arc<dyn Reporter>, ClusterError> {
        self.check_available()?;
        let reporter = lock(&self.reporters)
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(MemoryReporter::default()))
            .clone();
        Ok(reporter)
    }
}

#[derive(Default)]
struct BrokerState {
    env: HashMap<String, String>,
    endpoints: BTreeMap<String, Endpoint>,
    watchers: Vec<Arc<dyn BrokerWatcher>>,
}

/// In-process [`Broker`] with mutation helpers that notify watchers.
pub struct MemoryBroker {
    service: String,
    state: Mutex<BrokerState>,
}

impl MemoryBroker {
    fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            state: Mutex::new(BrokerState::default()),
        }
    }

    /// Sets `key` and notifies watchers.
    pub async fn setenv(&self, key: &str, value: &str) {
        let watchers = {
            let mut state = lock(&self.state);
            state.env.insert(key.to_string(), value.to_string());
            state.watchers.clone()
        };
        for w in watchers {
            w.on_setenv(key, value).await;
        }
    }

    /// Deletes `key` and notifies watchers.
    pub async fn delenv(&self, key: &str) {
        let watchers = {
            let mut state = lock(&self.state);
            state.env.remove(key);
            state.watchers.clone()
        };
        for w in watchers {
            w.on_delenv(key).await;
        }
    }

    /// Upserts `endpoint` and notifies watchers (even if nothing changed).
    pub async fn update_endpoint(&self, endpoint: Endpoint) {
        let watchers = {
            let mut state = lock(&self.state);
            state
                .endpoints
                .insert(endpoint.id.clone(), endpoint.clone());
            state.watchers.clone()
        };
        for w in watchers {
            w.on_update_endpoint(endpoint.clone()).await;
        }
    }

    /// Removes the endpoint `id` and notifies watchers (even if it was unknown).
    pub async fn delete_endpoint(&self, id: &str) {
        let watchers = {
            let mut state = lock(&self.state);
            state.endpoints.remove(id);
            state.watchers.clone()
        };
        for w in watchers {
            w.on_delete_endpoint(id).await;
        }
    }

    /// Number of registered watchers.
    pub fn watcher_count(&self) -> usize {
        lock(&self.state).watchers.len()
    }

    /// Number of endpoints currently in the membership set.
    pub fn endpoint_count(&self) -> usize {
        lock(&self.state).endpoints.len()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn service_name(&self) -> &str {
        &self.service
    }

    async fn getenv(&self, key: &str) -> Result<Option<String>, ClusterError> {
        Ok(lock(&self.state).env.get(key).cloned())
    }

    async fn endpoints(&self) -> Result<Vec<Endpoint>, ClusterError> {
        Ok(lock(&self.state).endpoints.values().cloned().collect())
    }

    async fn watch(&self, watcher: Arc<dyn BrokerWatcher>) {
        lock(&self.state).watchers.push(watcher);
    }
}

/// One call received by a [`MemoryReporter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReporterCall {
    Keepalive { addr: String, weight: u32, ttl: u64 },
    Close,
}

/// In-process [`Reporter`] that records every call.
#[derive(Default)]
pub struct MemoryReporter {
    calls: Mutex<Vec<ReporterCall>>,
}

impl MemoryReporter {
    /// Returns every call received so far, in order.
    pub fn calls(&self) -> Vec<ReporterCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Reporter for MemoryReporter {
    async fn keepalive(&self, addr: &str, weight: u32, ttl: u64) -> Result<(), ClusterError> {
        lock(&self.calls).push(ReporterCall::Keepalive {
            addr: addr.to_string(),
            weight,
            ttl,
        });
        Ok(())
    }

    async fn close(&self, _ctx: CancellationToken) {
        lock(&self.calls).push(ReporterCall::Close);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        updates: AtomicUsize,
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl BrokerWatcher for Counting {
        async fn on_setenv(&self, _key: &str, _value: &str) {}
        async fn on_delenv(&self, _key: &str) {}
        async fn on_update_endpoint(&self, _endpoint: Endpoint) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
        async fn on_delete_endpoint(&self, _id: &str) {
            self.deletes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn redundant_updates_are_still_broadcast() {
        let cluster = MemoryCluster::new("test");
        let broker = cluster.broker("ip");
        let watcher = Arc::new(Counting::default());
        broker.watch(watcher.clone()).await;

        let ep = Endpoint::new("e1", "10.0.0.1:80", 100);
        broker.update_endpoint(ep.clone()).await;
        broker.update_endpoint(ep).await;
        broker.delete_endpoint("missing").await;

        assert_eq!(watcher.updates.load(Ordering::SeqCst), 2);
        assert_eq!(watcher.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(broker.endpoint_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_cluster_rejects_handles() {
        let cluster = MemoryCluster::new("test");
        cluster.set_unavailable(Some("etcd down"));
        let err = cluster.new_broker("ip").await.err().expect("must fail");
        assert_eq!(
            err,
            ClusterError::Unavailable {
                error: "etcd down".into()
            }
        );

        cluster.set_unavailable(None);
        let broker = cluster.new_broker("ip").await.expect("broker");
        assert_eq!(broker.service_name(), "ip");
        assert_eq!(broker.getenv("options").await, Ok(None));
    }

    #[tokio::test]
    async fn reporter_records_calls_in_order() {
        let cluster = MemoryCluster::new("test");
        let reporter = cluster.new_reporter("api").await.expect("reporter");
        reporter.keepalive("10.0.0.2:8080", 100, 10).await.expect("keepalive");
        reporter.close(CancellationToken::new()).await;

        let calls = cluster.reporter("api").expect("recorded").calls();
        assert_eq!(
            calls,
            vec![
                ReporterCall::Keepalive {
                    addr: "10.0.0.2:8080".into(),
                    weight: 100,
                    ttl: 10
                },
                ReporterCall::Close,
            ]
        );
    }
}
