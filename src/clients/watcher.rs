//! # Discovery watcher: keeps one client in sync with the coordination store.
//!
//! ## State machine
//! ```text
//! Unbound ──init──► Resolving ──first snapshot + client.init──► Bound ──shutdown──► Unbound
//!                       └──────────────── error ───────────────► Unbound
//! ```
//!
//! ## Event flow
//! ```text
//! Broker ── on_setenv / on_delenv / on_update_endpoint / on_delete_endpoint
//!    │
//!    ▼
//! QueueObserver ── send(DiscoveryEvent) ──► [bounded mpsc] ──► drain task (one per client)
//!                                                                 │
//!                                                    lock DiscoveryState
//!                                                    apply(event) ─► changed?
//!                                                                 │ yes
//!                                                    client.new_options(raw, endpoints)
//!                                                    client.reinit(..)   (still under the lock)
//! ```
//!
//! ## Rules
//! - The observer is registered on the broker only **after** `client.init` succeeded.
//! - Events of one client are applied one at a time, in arrival order; at most one
//!   `reinit` is in flight per client. Different clients never contend.
//! - A failed `reinit` is logged and published; the new snapshot stays committed.
//! - Redundant endpoint updates and deletes of unknown IDs never reach the client.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clients::client::{Client, OPTIONS_KEY};
use crate::clients::directory::{DiscoveryEvent, DiscoveryState, EndpointDirectory, WatchState};
use crate::cluster::{Broker, BrokerWatcher, Endpoint};
use crate::error::ClientError;
use crate::events::{Bus, Event, EventKind};

/// Watches one broker on behalf of one discovery-bound client.
pub struct DiscoveryWatcher<C: Client> {
    client: Arc<C>,
    broker: Arc<dyn Broker>,
    bus: Bus,
    capacity: usize,
    state: Mutex<DiscoveryState>,
    stop: CancellationToken,
    drain: StdMutex<Option<JoinHandle<()>>>,
}

impl<C: Client> DiscoveryWatcher<C> {
    /// Creates an unbound watcher.
    pub(crate) fn new(client: Arc<C>, broker: Arc<dyn Broker>, bus: Bus, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            client,
            broker,
            bus,
            capacity: capacity.max(1),
            state: Mutex::new(DiscoveryState::new()),
            stop: CancellationToken::new(),
            drain: StdMutex::new(None),
        })
    }

    /// Resolves the first snapshot, initializes the client, then starts watching.
    pub(crate) async fn init(self: &Arc<Self>, ctx: &CancellationToken) -> Result<(), ClientError> {
        let service = self.broker.service_name().to_string();
        let mut state = self.state.lock().await;
        state.phase = WatchState::Resolving;

        let resolved = async {
            let raw = self
                .broker
                .getenv(OPTIONS_KEY)
                .await?
                .unwrap_or_default()
                .into_bytes();
            let endpoints = self.broker.endpoints().await?;
            Ok::<_, ClientError>((raw, endpoints))
        }
        .await;

        let (raw, endpoints) = match resolved {
            Ok(snapshot) => snapshot,
            Err(e) => {
                state.reset();
                return Err(e);
            }
        };

        let opts = self.client.new_options(&service, &raw, &endpoints);
        state.raw = raw;
        state.directory = EndpointDirectory::from_endpoints(endpoints);

        if let Err(e) = self.client.init(ctx.clone(), opts).await {
            state.reset();
            return Err(e);
        }
        state.phase = WatchState::Bound;
        tracing::debug!(
            client = self.client.name(),
            service = %service,
            endpoints = state.directory.len(),
            "discovery client bound"
        );
        drop(state);

        let (tx, rx) = mpsc::channel(self.capacity);
        let me = Arc::clone(self);
        let handle = tokio::spawn(async move { me.drain(rx).await });
        *self.drain.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        self.broker.watch(Arc::new(QueueObserver { tx })).await;
        Ok(())
    }

    /// Stops event processing and drops the cached snapshot.
    ///
    /// A `reinit` already in flight completes first.
    pub(crate) async fn shutdown(&self) {
        self.stop.cancel();
        let handle = self
            .drain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.state.lock().await.reset();
    }

    /// Current lifecycle phase.
    pub async fn state(&self) -> WatchState {
        self.state.lock().await.phase
    }

    /// Snapshot of the cached endpoint directory, sorted by ID.
    pub async fn directory(&self) -> Vec<Endpoint> {
        self.state.lock().await.directory.endpoints()
    }

    /// Snapshot of the cached raw options blob.
    pub async fn raw_options(&self) -> Vec<u8> {
        self.state.lock().await.raw.clone()
    }

    /// Service name this watcher is bound to.
    pub fn service_name(&self) -> &str {
        self.broker.service_name()
    }

    async fn drain(&self, mut rx: mpsc::Receiver<DiscoveryEvent>) {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                ev = rx.recv() => match ev {
                    Some(ev) => ev,
                    None => break,
                },
            };
            self.handle(event).await;
        }
    }

    async fn handle(&self, event: DiscoveryEvent) {
        let mut state = self.state.lock().await;
        if state.phase != WatchState::Bound || !state.apply(event) {
            return;
        }

        let service = self.broker.service_name();
        let endpoints = state.directory.endpoints();
        let count = endpoints.len();
        let opts = self.client.new_options(service, &state.raw, &endpoints);

        match self.client.reinit(self.stop.clone(), opts).await {
            Ok(()) => {
                tracing::info!(
                    client = self.client.name(),
                    service,
                    endpoints = count,
                    "client reinitialized"
                );
                self.bus.publish(
                    Event::new(EventKind::ClientReinitialized)
                        .with_name(self.client.name())
                        .with_service(service)
                        .with_endpoints(count),
                );
            }
            Err(e) => {
                tracing::warn!(
                    client = self.client.name(),
                    service,
                    endpoints = count,
                    error = %e,
                    "client reinit failed; keeping new snapshot cached"
                );
                self.bus.publish(
                    Event::new(EventKind::ClientReinitFailed)
                        .with_name(self.client.name())
                        .with_service(service)
                        .with_endpoints(count)
                        .with_reason(e.to_string()),
                );
            }
        }
    }
}

/// Broker-facing observer: turns callbacks into queued [`DiscoveryEvent`]s.
struct QueueObserver {
    tx: mpsc::Sender<DiscoveryEvent>,
}

impl QueueObserver {
    async fn push(&self, event: DiscoveryEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::trace!("discovery event dropped: watcher stopped");
        }
    }
}

#[async_trait]
impl BrokerWatcher for QueueObserver {
    async fn on_setenv(&self, key: &str, value: &str) {
        self.push(DiscoveryEvent::Setenv {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await;
    }

    async fn on_delenv(&self, key: &str) {
        self.push(DiscoveryEvent::Delenv {
            key: key.to_string(),
        })
        .await;
    }

    async fn on_update_endpoint(&self, endpoint: Endpoint) {
        self.push(DiscoveryEvent::UpdateEndpoint(endpoint)).await;
    }

    async fn on_delete_endpoint(&self, id: &str) {
        self.push(DiscoveryEvent::DeleteEndpoint { id: id.to_string() })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::client::ClientOptions;
    use crate::cluster::{MemoryBroker, MemoryCluster};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Debug)]
    struct SpyOptions {
        service: String,
        raw: Vec<u8>,
        endpoints: Vec<Endpoint>,
    }

    impl ClientOptions for SpyOptions {
        fn service_name(&self) -> &str {
            &self.service
        }
    }

    #[derive(Default)]
    struct Spy {
        inits: AtomicUsize,
        reinits: StdMutex<Vec<SpyOptions>>,
        fail_reinit: std::sync::atomic::AtomicBool,
        in_flight: AtomicUsize,
        overlap: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl Client for Spy {
        type Options = SpyOptions;

        fn name(&self) -> &str {
            "spy"
        }

        async fn init(&self, _ctx: CancellationToken, _opts: SpyOptions) -> Result<(), ClientError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn reinit(&self, _ctx: CancellationToken, opts: SpyOptions) -> Result<(), ClientError> {
            if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlap.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.reinits.lock().unwrap().push(opts);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_reinit.load(Ordering::SeqCst) {
                return Err(ClientError::Fail {
                    error: "rejected".into(),
                });
            }
            Ok(())
        }

        fn new_options(&self, service: &str, raw: &[u8], endpoints: &[Endpoint]) -> SpyOptions {
            SpyOptions {
                service: service.to_string(),
                raw: raw.to_vec(),
                endpoints: endpoints.to_vec(),
            }
        }

        async fn shutdown(&self, _ctx: CancellationToken) {}
    }

    async fn bound(spy: Arc<Spy>) -> (Arc<DiscoveryWatcher<Spy>>, Arc<MemoryBroker>) {
        let cluster = MemoryCluster::new("test");
        let broker = cluster.broker("ip");
        let watcher = DiscoveryWatcher::new(spy, broker.clone(), Bus::new(16), 4);
        watcher.init(&CancellationToken::new()).await.expect("init");
        (watcher, broker)
    }

    /// Polls until `n` reinit calls were recorded (events drain in FIFO order).
    async fn wait_reinits(spy: &Spy, n: usize) {
        for _ in 0..400 {
            if spy.reinits.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} reinit calls");
    }

    #[tokio::test]
    async fn init_binds_then_watches() {
        let spy = Arc::new(Spy::default());
        let (watcher, broker) = bound(spy.clone()).await;
        assert_eq!(watcher.state().await, WatchState::Bound);
        assert_eq!(spy.inits.load(Ordering::SeqCst), 1);
        assert_eq!(broker.watcher_count(), 1);
        assert!(watcher.directory().await.is_empty());
    }

    #[tokio::test]
    async fn redundant_endpoint_update_does_not_reinit() {
        let spy = Arc::new(Spy::default());
        let (watcher, broker) = bound(spy.clone()).await;

        let ep = Endpoint::new("e1", "10.0.0.1:80", 100);
        broker.update_endpoint(ep.clone()).await;
        broker.update_endpoint(ep.clone()).await;
        wait_reinits(&spy, 1).await;

        // Sentinel: once it is applied, the redundant update was processed too.
        broker.setenv(OPTIONS_KEY, "{}").await;
        wait_reinits(&spy, 2).await;

        let reinits = spy.reinits.lock().unwrap().clone();
        assert_eq!(reinits.len(), 2);
        assert_eq!(reinits[0].endpoints, vec![ep.clone()]);
        assert_eq!(watcher.directory().await, vec![ep]);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_noop() {
        let spy = Arc::new(Spy::default());
        let (watcher, broker) = bound(spy.clone()).await;
        broker
            .update_endpoint(Endpoint::new("e1", "10.0.0.1:80", 100))
            .await;
        wait_reinits(&spy, 1).await;

        broker.delete_endpoint("missing").await;
        broker.setenv(OPTIONS_KEY, "{}").await;
        wait_reinits(&spy, 2).await;

        let reinits = spy.reinits.lock().unwrap().clone();
        assert_eq!(reinits.len(), 2);
        assert_eq!(reinits[1].endpoints.len(), 1);
        assert_eq!(watcher.directory().await.len(), 1);
    }

    #[tokio::test]
    async fn reinits_are_serialized_and_see_full_snapshots() {
        let spy = Arc::new(Spy::default());
        let (watcher, broker) = bound(spy.clone()).await;

        broker.setenv(OPTIONS_KEY, r#"{"scheme":"http"}"#).await;
        for i in 0..5 {
            broker
                .update_endpoint(Endpoint::new(format!("n{i}"), format!("10.0.0.{i}:80"), 10))
                .await;
        }
        broker.delenv(OPTIONS_KEY).await;
        wait_reinits(&spy, 7).await;

        assert!(!spy.overlap.load(Ordering::SeqCst));
        let reinits = spy.reinits.lock().unwrap().clone();
        assert_eq!(reinits.len(), 7);
        assert_eq!(reinits[0].raw, br#"{"scheme":"http"}"#.to_vec());
        assert!(reinits[0].endpoints.is_empty());
        assert_eq!(reinits[5].endpoints.len(), 5);
        assert_eq!(reinits[5].raw, br#"{"scheme":"http"}"#.to_vec());
        assert!(reinits[6].raw.is_empty());
        assert_eq!(reinits[6].service, "ip");
    }

    #[tokio::test]
    async fn failed_reinit_keeps_snapshot_committed() {
        let spy = Arc::new(Spy::default());
        spy.fail_reinit.store(true, Ordering::SeqCst);
        let (watcher, broker) = bound(spy.clone()).await;

        broker
            .update_endpoint(Endpoint::new("e1", "10.0.0.1:80", 100))
            .await;
        wait_reinits(&spy, 1).await;

        assert_eq!(watcher.directory().await.len(), 1);
        assert_eq!(watcher.state().await, WatchState::Bound);
    }

    #[tokio::test]
    async fn shutdown_unbinds_and_ignores_late_events() {
        let spy = Arc::new(Spy::default());
        let (watcher, broker) = bound(spy.clone()).await;

        watcher.shutdown().await;
        assert_eq!(watcher.state().await, WatchState::Unbound);

        broker
            .update_endpoint(Endpoint::new("e1", "10.0.0.1:80", 100))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(spy.reinits.lock().unwrap().is_empty());
        assert!(watcher.directory().await.is_empty());
    }

    #[tokio::test]
    async fn resolve_failure_leaves_watcher_unbound() {
        struct Down;

        #[async_trait]
        impl Broker for Down {
            fn service_name(&self) -> &str {
                "ip"
            }
            async fn getenv(&self, _key: &str) -> Result<Option<String>, crate::ClusterError> {
                Err(crate::ClusterError::Closed)
            }
            async fn endpoints(&self) -> Result<Vec<Endpoint>, crate::ClusterError> {
                Ok(Vec::new())
            }
            async fn watch(&self, _watcher: Arc<dyn BrokerWatcher>) {}
        }

        let spy = Arc::new(Spy::default());
        let watcher = DiscoveryWatcher::new(spy.clone(), Arc::new(Down), Bus::new(4), 4);
        let err = watcher
            .init(&CancellationToken::new())
            .await
            .expect_err("must fail");
        assert_eq!(err.as_label(), "client_discovery");
        assert_eq!(watcher.state().await, WatchState::Unbound);
        assert_eq!(spy.inits.load(Ordering::SeqCst), 0);
    }
}
