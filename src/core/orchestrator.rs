//! # Orchestrator: client init, gated service start, ordered teardown.
//!
//! The [`Orchestrator`] binds a coordination-store handle ([`Cluster`]), owns the shared
//! client [`Registry`] and the list of set-up services, and drives one run through five
//! phases.
//!
//! ## High-level architecture
//! ```text
//! Before run():
//!   registry.register(client, config, description)   (anywhere, shared Arc<Registry>)
//!   orchestrator.join(cluster)
//!   orchestrator.setup(ServiceSpec)
//!
//! run(ctx):
//!   no cluster ──────────────────────────────► Err(InvalidCluster), nothing called
//!   run_ctx = ctx.child_token()                (cancelled on every exit)
//!   subscriber_listener(): Bus ─► SubscriberSet::emit(&Event)
//!
//!   1. init      registry.seal() ─► record.init() in registration order
//!                  first failure ─► Err(ClientInit)
//!   2. prepare   service.init() in setup order, then spawn boot task (waits on barrier)
//!                  first failure ─► cancel service ctx, drain tasks, Err(ServicePrepare)
//!   3. start     barrier.release() ─► StartReleased
//!   4. wait      JoinSet drained (every service's run returned)
//!   5. teardown  record.shutdown() in registration order (always, even on error/panic)
//! ```
//!
//! ## Cancellation
//! - Cancelling `ctx` (or an OS signal with `Config::shutdown_on_signal`) before phase 3
//!   keeps prepared services from ever running.
//! - After phase 3 cancellation is advisory; `run` still waits for every service.
//! - Dropping the `run` future abandons the run without teardown; cancel `ctx` and let
//!   `run` return instead.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::clients::{ClientRecord, InitEnv, Registry};
use crate::cluster::Cluster;
use crate::config::Config;
use crate::core::barrier::StartBarrier;
use crate::core::lifecycle;
use crate::core::overview::{Overview, OverviewRow};
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::services::ServiceSpec;
use crate::subscribers::SubscriberSet;

/// Coordinates clients, services, the start barrier and teardown.
///
/// Built with [`OrchestratorBuilder`](crate::OrchestratorBuilder).
pub struct Orchestrator {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: Arc<Registry>,
    cluster: Mutex<Option<Arc<dyn Cluster>>>,
    services: Mutex<Vec<ServiceSpec>>,
}

impl Orchestrator {
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            registry,
            cluster: Mutex::new(None),
            services: Mutex::new(Vec::new()),
        }
    }

    /// Binds the coordination store used by discovery-bound clients and reporting services.
    ///
    /// A later call replaces the previous binding.
    pub fn join(&self, cluster: Arc<dyn Cluster>) {
        tracing::info!(cluster = cluster.name(), "cluster joined");
        *lock(&self.cluster) = Some(cluster);
    }

    /// Adds a service; no uniqueness is enforced.
    pub fn setup(&self, spec: ServiceSpec) {
        tracing::debug!(
            service = spec.name(),
            reporting = spec.reporting().is_some(),
            "service set up"
        );
        lock(&self.services).push(spec);
    }

    /// The shared client registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Receiver observing every event published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Snapshot of the cluster, clients and services.
    pub fn overview(&self) -> Overview {
        let cluster = lock(&self.cluster).as_ref().map(|c| c.name().to_string());
        let clients = self
            .registry
            .records()
            .iter()
            .map(|r| OverviewRow {
                kind: r.kind().as_str(),
                name: r.name().to_string(),
                description: r.description().to_string(),
            })
            .collect();
        let services = lock(&self.services)
            .iter()
            .map(|s| OverviewRow {
                kind: "service",
                name: s.name().to_string(),
                description: s.description().to_string(),
            })
            .collect();
        Overview {
            cluster,
            clients,
            services,
        }
    }

    /// Runs every phase; returns once all services have finished and clients are shut down.
    ///
    /// # Errors
    /// - [`RuntimeError::InvalidCluster`] if [`join`](Self::join) was never called
    ///   (no client or service method is invoked).
    /// - [`RuntimeError::ClientInit`] for the first client that failed to initialize.
    /// - [`RuntimeError::ServicePrepare`] for the first service whose `init` failed.
    pub async fn run(&self, ctx: CancellationToken) -> Result<(), RuntimeError> {
        let cluster = lock(&self.cluster)
            .clone()
            .ok_or(RuntimeError::InvalidCluster)?;

        let run_ctx = ctx.child_token();
        let _guard = run_ctx.clone().drop_guard();

        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(listener_stop.clone());
        let signals = self
            .cfg
            .shutdown_on_signal
            .then(|| shutdown::spawn_signal_listener(self.bus.clone(), run_ctx.clone()));

        let clients = self.registry.seal();
        let services = lock(&self.services).clone();
        tracing::info!(
            cluster = cluster.name(),
            clients = clients.len(),
            services = services.len(),
            "run starting"
        );

        let outcome = AssertUnwindSafe(self.drive(&run_ctx, &cluster, &clients, services))
            .catch_unwind()
            .await;

        self.teardown(&run_ctx, &clients).await;

        if let Some(signals) = signals {
            signals.abort();
        }
        listener_stop.cancel();
        if let Some(listener) = listener {
            let _ = listener.await;
        }

        match outcome {
            Ok(res) => {
                match &res {
                    Ok(()) => tracing::info!("run finished"),
                    Err(e) => tracing::error!(error = %e, label = e.as_label(), "run aborted"),
                }
                res
            }
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    /// Phases 1-4.
    async fn drive(
        &self,
        run_ctx: &CancellationToken,
        cluster: &Arc<dyn Cluster>,
        clients: &[Arc<ClientRecord>],
        services: Vec<ServiceSpec>,
    ) -> Result<(), RuntimeError> {
        self.init_clients(run_ctx, cluster, clients).await?;

        let service_ctx = run_ctx.child_token();
        let barrier = StartBarrier::new();
        let mut set = JoinSet::new();

        if let Err(e) = self
            .prepare_services(&mut set, &service_ctx, cluster, &barrier, services)
            .await
        {
            service_ctx.cancel();
            wait_all(&mut set).await;
            return Err(e);
        }

        barrier.release();
        tracing::info!(services = set.len(), "start barrier released");
        self.bus.publish(Event::new(EventKind::StartReleased));

        wait_all(&mut set).await;
        Ok(())
    }

    async fn init_clients(
        &self,
        run_ctx: &CancellationToken,
        cluster: &Arc<dyn Cluster>,
        clients: &[Arc<ClientRecord>],
    ) -> Result<(), RuntimeError> {
        for record in clients {
            let env = InitEnv {
                ctx: run_ctx,
                cluster,
                bus: &self.bus,
                watcher_capacity: self.cfg.watcher_capacity_clamped(),
            };
            match record.init(env).await {
                Ok(()) => {
                    let mut ev = Event::new(EventKind::ClientInitialized)
                        .with_name(record.name())
                        .with_service(record.service_name());
                    if let Some(dir) = record.directory().await {
                        ev = ev.with_endpoints(dir.len());
                    }
                    tracing::info!(
                        client = record.name(),
                        kind = record.kind().as_str(),
                        service = record.service_name(),
                        "client initialized"
                    );
                    self.bus.publish(ev);
                }
                Err(e) => {
                    tracing::error!(client = record.name(), error = %e, "client init failed");
                    self.bus.publish(
                        Event::new(EventKind::ClientInitFailed)
                            .with_name(record.name())
                            .with_reason(e.to_string()),
                    );
                    return Err(RuntimeError::ClientInit {
                        client: record.name().to_string(),
                        source: e,
                    });
                }
            }
        }
        Ok(())
    }

    async fn prepare_services(
        &self,
        set: &mut JoinSet<()>,
        service_ctx: &CancellationToken,
        cluster: &Arc<dyn Cluster>,
        barrier: &StartBarrier,
        services: Vec<ServiceSpec>,
    ) -> Result<(), RuntimeError> {
        for spec in services {
            lifecycle::prepare(&spec, service_ctx, &self.bus)
                .await
                .map_err(|source| RuntimeError::ServicePrepare {
                    service: spec.name().to_string(),
                    source,
                })?;
            set.spawn(lifecycle::boot(
                spec,
                service_ctx.clone(),
                barrier.clone(),
                Arc::clone(cluster),
                self.bus.clone(),
            ));
        }
        Ok(())
    }

    /// Phase 5: shuts down every client in registration order; un-initialized ones are skipped.
    async fn teardown(&self, run_ctx: &CancellationToken, clients: &[Arc<ClientRecord>]) {
        for record in clients {
            if record.shutdown(run_ctx).await {
                tracing::info!(client = record.name(), "client shut down");
                self.bus
                    .publish(Event::new(EventKind::ClientShutdown).with_name(record.name()));
            }
        }
    }

    /// Forwards bus events to the subscriber set until `stop`, then drains what is left.
    fn subscriber_listener(&self, stop: CancellationToken) -> Option<JoinHandle<()>> {
        if self.subs.is_empty() {
            return None;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
        }))
    }
}

/// Waits for every service task; task-level panics are already reported by the task.
async fn wait_all(set: &mut JoinSet<()>) {
    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            tracing::warn!(error = %e, "service task ended abnormally");
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
