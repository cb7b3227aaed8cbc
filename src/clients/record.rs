//! # Client records: one per registration.
//!
//! [`ClientRecord`] erases the concrete [`Client`] type behind an internal binding so the
//! registry can keep heterogeneous clients in registration order.
//!
//! ## Readiness
//! ```text
//! ready=false ──init (CAS false→true)──► implementation init ──Ok──► ready=true
//!                                                             └─Err─► ready=false
//! ready=true  ──shutdown (CAS true→false)──► watcher stop ──► implementation shutdown
//! ```
//! Duplicate or late `init`/`shutdown` calls lose the CAS and return without touching
//! the implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::clients::client::{Client, ClientConfig, ClientKind};
use crate::clients::directory::WatchState;
use crate::clients::watcher::DiscoveryWatcher;
use crate::cluster::{Cluster, Endpoint};
use crate::error::ClientError;
use crate::events::Bus;

/// Runtime resources handed to a client binding at init time.
pub(crate) struct InitEnv<'a> {
    pub(crate) ctx: &'a CancellationToken,
    pub(crate) cluster: &'a Arc<dyn Cluster>,
    pub(crate) bus: &'a Bus,
    pub(crate) watcher_capacity: usize,
}

/// Type-erased view of a registered client.
#[async_trait]
trait Binding: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn kind(&self) -> ClientKind;
    fn service_name(&self) -> &str;
    async fn init(&self, env: InitEnv<'_>) -> Result<(), ClientError>;
    async fn shutdown(&self, ctx: &CancellationToken);
    async fn directory(&self) -> Option<Vec<Endpoint>>;
    async fn watch_state(&self) -> Option<WatchState>;
}

struct Bound<C: Client> {
    client: Arc<C>,
    config: ClientConfig<C::Options>,
    watcher: Mutex<Option<Arc<DiscoveryWatcher<C>>>>,
}

impl<C: Client> Bound<C> {
    fn current_watcher(&self) -> Option<Arc<DiscoveryWatcher<C>>> {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl<C: Client> Binding for Bound<C> {
    fn name(&self) -> &str {
        self.client.name()
    }

    fn kind(&self) -> ClientKind {
        self.config.kind()
    }

    fn service_name(&self) -> &str {
        self.config.service_name()
    }

    async fn init(&self, env: InitEnv<'_>) -> Result<(), ClientError> {
        match &self.config {
            ClientConfig::Static(opts) => self.client.init(env.ctx.clone(), opts.clone()).await,
            ClientConfig::Discovery(discovery) => {
                let broker = env.cluster.new_broker(discovery.service_name()).await?;
                let watcher = DiscoveryWatcher::new(
                    Arc::clone(&self.client),
                    broker,
                    env.bus.clone(),
                    env.watcher_capacity,
                );
                watcher.init(env.ctx).await?;
                *self.watcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(watcher);
                Ok(())
            }
        }
    }

    async fn shutdown(&self, ctx: &CancellationToken) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.shutdown().await;
        }
        self.client.shutdown(ctx.clone()).await;
    }

    async fn directory(&self) -> Option<Vec<Endpoint>> {
        match self.current_watcher() {
            Some(w) => Some(w.directory().await),
            None => None,
        }
    }

    async fn watch_state(&self) -> Option<WatchState> {
        match (&self.config, self.current_watcher()) {
            (ClientConfig::Static(_), _) => None,
            (ClientConfig::Discovery(_), Some(w)) => Some(w.state().await),
            (ClientConfig::Discovery(_), None) => Some(WatchState::Unbound),
        }
    }
}

/// One client registration: the client, its configuration, a description and its
/// readiness flag.
pub struct ClientRecord {
    description: String,
    ready: AtomicBool,
    binding: Box<dyn Binding>,
}

impl ClientRecord {
    pub(crate) fn new<C: Client>(
        client: Arc<C>,
        config: ClientConfig<C::Options>,
        description: String,
    ) -> Self {
        Self {
            description,
            ready: AtomicBool::new(false),
            binding: Box::new(Bound {
                client,
                config,
                watcher: Mutex::new(None),
            }),
        }
    }

    /// Client name.
    pub fn name(&self) -> &str {
        self.binding.name()
    }

    /// Registration description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Static or discovery-bound.
    pub fn kind(&self) -> ClientKind {
        self.binding.kind()
    }

    /// Remote service name of the configuration.
    pub fn service_name(&self) -> &str {
        self.binding.service_name()
    }

    /// True between a successful `init` and `shutdown`.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Cached endpoint directory of a bound discovery client (`None` otherwise).
    pub async fn directory(&self) -> Option<Vec<Endpoint>> {
        self.binding.directory().await
    }

    /// Discovery watcher phase (`None` for static clients).
    pub async fn watch_state(&self) -> Option<WatchState> {
        self.binding.watch_state().await
    }

    /// Initializes the client; a no-op if it is already ready.
    pub(crate) async fn init(&self, env: InitEnv<'_>) -> Result<(), ClientError> {
        if self
            .ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        let res = self.binding.init(env).await;
        if res.is_err() {
            self.ready.store(false, Ordering::Release);
        }
        res
    }

    /// Shuts the client down; returns `false` if it was not ready (nothing done).
    pub(crate) async fn shutdown(&self, ctx: &CancellationToken) -> bool {
        if self
            .ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.binding.shutdown(ctx).await;
        true
    }
}

impl std::fmt::Debug for ClientRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRecord")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("service", &self.service_name())
            .field("description", &self.description)
            .field("ready", &self.is_ready())
            .finish()
    }
}
