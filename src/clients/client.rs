//! # Client capability and configuration variants.
//!
//! A [`Client`] is an outbound connection owner (HTTP client, RPC stub, cache handle...)
//! whose configuration is produced either once at registration ([`ClientConfig::Static`])
//! or continuously from the coordination store ([`ClientConfig::Discovery`]).
//!
//! Configuration snapshots are plain values: a reconfiguration always hands the client
//! a complete new `Options` value, never a partial update.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cluster::Endpoint;
use crate::error::ClientError;

/// Configuration key holding a discovery-bound client's raw options blob.
pub const OPTIONS_KEY: &str = "options";

/// Configuration snapshot accepted by a [`Client`].
pub trait ClientOptions: Clone + Send + Sync + 'static {
    /// Name of the remote service these options point at.
    fn service_name(&self) -> &str;
}

/// # Outbound client managed by the orchestrator.
///
/// Implementations own their readiness: `init`/`reinit` may be called from different
/// tasks, but the runtime never issues two `reinit` calls for the same client at once.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use hostvisor::{Client, ClientError, ClientOptions, Endpoint};
///
/// #[derive(Clone)]
/// struct PingOptions { service: String, targets: Vec<Endpoint> }
///
/// impl ClientOptions for PingOptions {
///     fn service_name(&self) -> &str { &self.service }
/// }
///
/// struct Ping;
///
/// #[async_trait]
/// impl Client for Ping {
///     type Options = PingOptions;
///
///     fn name(&self) -> &str { "ping" }
///
///     async fn init(&self, _ctx: CancellationToken, _opts: PingOptions) -> Result<(), ClientError> {
///         Ok(())
///     }
///
///     async fn reinit(&self, _ctx: CancellationToken, _opts: PingOptions) -> Result<(), ClientError> {
///         Ok(())
///     }
///
///     fn new_options(&self, service: &str, _raw: &[u8], endpoints: &[Endpoint]) -> PingOptions {
///         PingOptions { service: service.to_string(), targets: endpoints.to_vec() }
///     }
///
///     async fn shutdown(&self, _ctx: CancellationToken) {}
/// }
/// ```
#[async_trait]
pub trait Client: Send + Sync + 'static {
    /// Configuration snapshot type.
    type Options: ClientOptions;

    /// Returns a stable, human-readable client name.
    fn name(&self) -> &str;

    /// First initialization with `opts`.
    async fn init(&self, ctx: CancellationToken, opts: Self::Options) -> Result<(), ClientError>;

    /// Replaces the active configuration with `opts`.
    ///
    /// On error the client should keep serving with its previous configuration.
    async fn reinit(&self, ctx: CancellationToken, opts: Self::Options)
    -> Result<(), ClientError>;

    /// Builds an options snapshot from the raw options blob and the endpoint set of
    /// `service`. `raw` is empty when the store has no options.
    fn new_options(&self, service: &str, raw: &[u8], endpoints: &[Endpoint]) -> Self::Options;

    /// Releases the client's resources.
    async fn shutdown(&self, ctx: CancellationToken);
}

/// Discovery binding: the remote service whose options/endpoints configure a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryOptions {
    service: String,
}

impl DiscoveryOptions {
    /// Binds to `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Service name resolved through the coordination store.
    pub fn service_name(&self) -> &str {
        &self.service
    }
}

/// How a client's configuration is obtained.
#[derive(Clone, Debug)]
pub enum ClientConfig<O> {
    /// Fixed options supplied at registration.
    Static(O),
    /// Options and endpoints resolved (and kept current) from the coordination store.
    Discovery(DiscoveryOptions),
}

impl<O: ClientOptions> ClientConfig<O> {
    /// Shorthand for `ClientConfig::Discovery(DiscoveryOptions::new(service))`.
    pub fn discovery(service: impl Into<String>) -> Self {
        ClientConfig::Discovery(DiscoveryOptions::new(service))
    }

    /// Service name of either variant.
    pub fn service_name(&self) -> &str {
        match self {
            ClientConfig::Static(opts) => opts.service_name(),
            ClientConfig::Discovery(d) => d.service_name(),
        }
    }

    /// Discriminant of the variant.
    pub fn kind(&self) -> ClientKind {
        match self {
            ClientConfig::Static(_) => ClientKind::Static,
            ClientConfig::Discovery(_) => ClientKind::Discovery,
        }
    }
}

/// Configuration variant discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientKind {
    Static,
    Discovery,
}

impl ClientKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientKind::Static => "static",
            ClientKind::Discovery => "discovery",
        }
    }
}
