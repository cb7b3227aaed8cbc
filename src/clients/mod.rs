//! # Clients: capability, registration and discovery binding.
//!
//! - [`Client`] / [`ClientOptions`] / [`ClientConfig`] - what a client is and how it is configured
//! - [`Registry`] / [`ClientRecord`] - ordered registrations with readiness tracking
//! - [`DiscoveryWatcher`] - keeps a discovery-bound client in sync with its broker
//! - [`EndpointDirectory`] - per-client endpoint set keyed by endpoint ID

mod client;
mod directory;
mod record;
mod registry;
mod watcher;

pub use client::{Client, ClientConfig, ClientKind, ClientOptions, DiscoveryOptions, OPTIONS_KEY};
pub use directory::{EndpointDirectory, WatchState};
pub use record::ClientRecord;
pub(crate) use record::InitEnv;
pub use registry::Registry;
pub use watcher::DiscoveryWatcher;
