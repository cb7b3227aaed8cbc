//! # hostvisor
//!
//! **Hostvisor** is an in-process runtime orchestrator for backend programs that host
//! several long-running services and several outbound clients in one process.
//!
//! It registers clients and services before startup, starts every service behind a single
//! start barrier, tears clients down in registration order, and keeps discovery-bound
//! clients in sync with a coordination store while the process runs.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Registry (Arc, shared)          Orchestrator::setup(ServiceSpec)
//!   register(client, config)                       │
//!        │                                         │
//!        ▼                                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - Cluster (joined coordination store)                            │
//! │  - Registry (client records, sealed at run)                       │
//! │  - services (ServiceSpec list)                                    │
//! │  - Bus + SubscriberSet (runtime events)                           │
//! └──────┬─────────────────────────────┬──────────────────────────────┘
//!        │ 1. init clients             │ 2. prepare services
//!        ▼                             ▼
//!  ┌────────────────┐          ┌────────────────┐   3. StartBarrier::release()
//!  │ ClientRecord   │          │ service task   │◄──────────────────────────
//!  │ static: init   │          │ wait barrier   │
//!  │ discovery:     │          │ keepalive      │   4. wait for every task
//!  │  DiscoveryWatcher         │ run / close    │
//!  └──────┬─────────┘          └────────────────┘   5. shutdown clients
//!         │ broker events (any time)
//!         ▼
//!  bounded queue ─► drain task ─► apply to EndpointDirectory ─► reinit (serialized)
//! ```
//!
//! ### Events
//! ```text
//! Orchestrator / service tasks / watchers ── publish(Event) ──► Bus
//!                                                               │
//!                                                  subscriber_listener
//!                                                               ▼
//!                                                        SubscriberSet
//!                                                  (per-subscriber queues)
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                              |
//! |-------------------|-------------------------------------------------------------------|-------------------------------------------------|
//! | **Clients**       | Outbound clients with static or discovery-bound configuration.    | [`Client`], [`ClientConfig`], [`Registry`]      |
//! | **Discovery**     | Store-driven reconfiguration with redundant-update suppression.   | [`DiscoveryWatcher`], [`EndpointDirectory`]     |
//! | **Services**      | Two-phase services started together behind one barrier.           | [`Service`], [`ServiceFn`], [`ServiceSpec`]     |
//! | **Orchestration** | Phased run and ordered teardown.                                  | [`Orchestrator`], [`OrchestratorBuilder`]       |
//! | **Store**         | Coordination-store contracts and an in-process implementation.    | [`Cluster`], [`Broker`], [`MemoryCluster`]      |
//! | **Subscriber API**| Hook into lifecycle events.                                       | [`Subscribe`], [`Event`], [`EventKind`]         |
//! | **Errors**        | Typed errors for every layer.                                     | [`RuntimeError`], [`ClientError`], ...          |
//! | **Configuration** | Centralize runtime settings.                                      | [`Config`]                                      |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//! - `http`: exports the [`builtin::http`] client shell.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use hostvisor::{Config, MemoryCluster, OrchestratorBuilder, Registry, ServiceFn, ServiceSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new();
//!     // registry.register(client, ClientConfig::discovery("ip"), "ip lookup")?;
//!
//!     let orch = OrchestratorBuilder::new(Config::default())
//!         .with_registry(registry)
//!         .build();
//!     orch.join(MemoryCluster::new("local"));
//!
//!     let hello = ServiceFn::arc("hello", |_ctx: CancellationToken| async move {
//!         println!("Hello from service!");
//!     });
//!     orch.setup(ServiceSpec::new(hello, "prints once"));
//!
//!     print!("{}", orch.overview());
//!     orch.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```
mod clients;
mod cluster;
mod config;
mod core;
mod error;
mod events;
mod services;
mod subscribers;

pub mod adapter;
pub mod builtin;

// ---- Public re-exports ----

pub use clients::{
    Client, ClientConfig, ClientKind, ClientOptions, ClientRecord, DiscoveryOptions,
    DiscoveryWatcher, EndpointDirectory, OPTIONS_KEY, Registry, WatchState,
};
pub use cluster::{
    Broker, BrokerWatcher, Cluster, Endpoint, MemoryBroker, MemoryCluster, MemoryReporter,
    Reporter, ReporterCall,
};
pub use config::Config;
pub use self::core::{Orchestrator, OrchestratorBuilder, Overview, OverviewRow, StartBarrier};
pub use error::{
    AdapterError, ClientError, ClusterError, RegistrationError, RuntimeError, ServiceError,
};
pub use events::{Bus, Event, EventKind};
pub use services::{Reporting, Service, ServiceFn, ServiceRef, ServiceSpec};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
