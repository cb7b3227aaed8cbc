use std::sync::Arc;

use crate::{
    clients::Registry,
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};
use super::orchestrator::Orchestrator;

/// Builder for constructing an [`Orchestrator`].
///
/// ## Example
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use hostvisor::{Config, OrchestratorBuilder, Registry};
///
/// let registry = Registry::new();
/// let orch = OrchestratorBuilder::new(Config::default())
///     .with_registry(registry.clone())
///     .build();
/// assert!(orch.registry().is_empty());
/// # }
/// ```
pub struct OrchestratorBuilder {
    cfg: Config,
    registry: Option<Arc<Registry>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registry: None,
            subscribers: Vec::new(),
        }
    }

    /// Uses `registry` as the client registry.
    ///
    /// The same handle is typically passed to every component that registers clients.
    /// Without it the orchestrator gets its own empty registry.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (client init/reinit, service lifecycle, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the orchestrator.
    ///
    /// Must be called from within a tokio runtime (subscriber workers are spawned here).
    pub fn build(self) -> Arc<Orchestrator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let registry = self.registry.unwrap_or_default();

        Arc::new(Orchestrator::new_internal(self.cfg, bus, subs, registry))
    }
}
