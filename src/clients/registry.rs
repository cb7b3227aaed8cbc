//! # Client registry - ordered, append-only list of client registrations.
//!
//! The registry is created once at composition time and shared (`Arc<Registry>`) with
//! every place that registers clients; the orchestrator receives the same handle through
//! its builder.
//!
//! ## Rules
//! - Registration order is preserved; it is the init order and the teardown order.
//! - Records are never removed.
//! - `Orchestrator::run` seals the registry; later registrations fail with
//!   [`RegistrationError::Sealed`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clients::client::{Client, ClientConfig};
use crate::clients::record::ClientRecord;
use crate::error::RegistrationError;

#[derive(Default)]
struct Inner {
    records: Vec<Arc<ClientRecord>>,
    sealed: bool,
}

/// Process-wide collection of client registrations.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    /// Creates an empty, shareable registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `client` with `config`.
    ///
    /// The returned record can be kept to inspect readiness or the discovery directory.
    ///
    /// # Errors
    /// - [`RegistrationError::InvalidReference`] if the client has an empty name or the
    ///   discovery binding has an empty service name.
    /// - [`RegistrationError::Sealed`] once a run has started.
    pub fn register<C: Client>(
        &self,
        client: Arc<C>,
        config: ClientConfig<C::Options>,
        description: impl Into<String>,
    ) -> Result<Arc<ClientRecord>, RegistrationError> {
        if client.name().is_empty() {
            return Err(RegistrationError::InvalidReference {
                reason: "client name is empty".into(),
            });
        }
        if let ClientConfig::Discovery(d) = &config {
            if d.service_name().is_empty() {
                return Err(RegistrationError::InvalidReference {
                    reason: format!("client '{}' has an empty discovery service name", client.name()),
                });
            }
        }

        let record = Arc::new(ClientRecord::new(client, config, description.into()));

        let mut inner = self.lock();
        if inner.sealed {
            return Err(RegistrationError::Sealed);
        }
        inner.records.push(Arc::clone(&record));
        drop(inner);

        tracing::debug!(
            client = record.name(),
            kind = record.kind().as_str(),
            service = record.service_name(),
            "client registered"
        );
        Ok(record)
    }

    /// Snapshot of all records in registration order.
    pub fn records(&self) -> Vec<Arc<ClientRecord>> {
        self.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// True once a run has taken the registry.
    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    /// Seals the registry and returns its records in registration order.
    pub(crate) fn seal(&self) -> Vec<Arc<ClientRecord>> {
        let mut inner = self.lock();
        inner.sealed = true;
        inner.records.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::client::{ClientKind, ClientOptions};
    use crate::clients::record::InitEnv;
    use crate::cluster::{Cluster, Endpoint, MemoryCluster};
    use crate::error::ClientError;
    use crate::events::Bus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    #[derive(Clone)]
    struct Opts(String);

    impl ClientOptions for Opts {
        fn service_name(&self) -> &str {
            &self.0
        }
    }

    #[derive(Default)]
    struct Counter {
        name: &'static str,
        inits: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    #[async_trait]
    impl Client for Counter {
        type Options = Opts;

        fn name(&self) -> &str {
            self.name
        }

        async fn init(&self, _ctx: CancellationToken, _opts: Opts) -> Result<(), ClientError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn reinit(&self, _ctx: CancellationToken, _opts: Opts) -> Result<(), ClientError> {
            Ok(())
        }

        fn new_options(&self, service: &str, _raw: &[u8], _endpoints: &[Endpoint]) -> Opts {
            Opts(service.to_string())
        }

        async fn shutdown(&self, _ctx: CancellationToken) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter(name: &'static str) -> Arc<Counter> {
        Arc::new(Counter {
            name,
            ..Counter::default()
        })
    }

    #[test]
    fn keeps_registration_order() {
        let registry = Registry::new();
        registry
            .register(counter("a"), ClientConfig::Static(Opts("a".into())), "first")
            .expect("a");
        registry
            .register(counter("b"), ClientConfig::discovery("b"), "second")
            .expect("b");
        registry
            .register(counter("a"), ClientConfig::Static(Opts("a2".into())), "dup name")
            .expect("duplicate names are separate registrations");

        let records = registry.records();
        let names: Vec<_> = records.iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        assert_eq!(records[1].kind(), ClientKind::Discovery);
        assert_eq!(records[2].description(), "dup name");
    }

    #[test]
    fn rejects_unbindable_registrations() {
        let registry = Registry::new();
        let err = registry
            .register(counter(""), ClientConfig::Static(Opts("x".into())), "")
            .expect_err("empty name");
        assert_eq!(err.as_label(), "registration_invalid_reference");

        let err = registry
            .register(counter("ip"), ClientConfig::discovery(""), "")
            .expect_err("empty service");
        assert!(matches!(err, RegistrationError::InvalidReference { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn sealed_registry_rejects_registration() {
        let registry = Registry::new();
        registry
            .register(counter("a"), ClientConfig::Static(Opts("a".into())), "")
            .expect("a");
        assert_eq!(registry.seal().len(), 1);
        assert!(registry.is_sealed());

        let err = registry
            .register(counter("b"), ClientConfig::Static(Opts("b".into())), "")
            .expect_err("sealed");
        assert_eq!(err, RegistrationError::Sealed);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_init_and_shutdown_are_noops() {
        let registry = Registry::new();
        let client = counter("a");
        let record = registry
            .register(client.clone(), ClientConfig::Static(Opts("a".into())), "")
            .expect("a");
        let cluster: Arc<dyn Cluster> = MemoryCluster::new("test");
        let bus = Bus::new(4);
        let ctx = CancellationToken::new();

        for _ in 0..2 {
            record
                .init(InitEnv {
                    ctx: &ctx,
                    cluster: &cluster,
                    bus: &bus,
                    watcher_capacity: 4,
                })
                .await
                .expect("init");
        }
        assert!(record.is_ready());
        assert_eq!(client.inits.load(Ordering::SeqCst), 1);

        assert!(record.shutdown(&ctx).await);
        assert!(!record.shutdown(&ctx).await);
        assert_eq!(client.shutdowns.load(Ordering::SeqCst), 1);
        assert!(!record.is_ready());
    }
}
