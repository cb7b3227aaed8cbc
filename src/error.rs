//! Error types used by the hostvisor runtime, its clients and services.
//!
//! - [`RuntimeError`] - failures of the orchestration run itself (returned by `Orchestrator::run`).
//! - [`RegistrationError`] - a client registration that could not be accepted.
//! - [`ClientError`] - failures raised by client implementations or their discovery binding.
//! - [`ServiceError`] - failures raised by service implementations during `init`.
//! - [`ClusterError`] - failures of the coordination-store collaborator.
//!
//! Every enum exposes `as_label` (short stable snake_case label for logs/metrics).

use thiserror::Error;

/// # Errors produced by the orchestration run.
///
/// Synchronous phases (client init, service prepare) stop at the first failure and
/// surface it here; no service is left running when one of these is returned.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `run` was called before a cluster was joined.
    #[error("invalid cluster: no coordination store joined")]
    InvalidCluster,

    /// A registered client failed to initialize; no service was prepared.
    #[error("client '{client}' failed to initialize: {source}")]
    ClientInit {
        /// Name of the failing client.
        client: String,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },

    /// A service failed its `init` phase; no service was released past the start barrier.
    #[error("service '{service}' failed to prepare: {source}")]
    ServicePrepare {
        /// Name of the failing service.
        service: String,
        /// Underlying service error.
        #[source]
        source: ServiceError,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use hostvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::InvalidCluster.as_label(), "runtime_invalid_cluster");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidCluster => "runtime_invalid_cluster",
            RuntimeError::ClientInit { .. } => "runtime_client_init",
            RuntimeError::ServicePrepare { .. } => "runtime_service_prepare",
        }
    }
}

/// # Errors produced by `Registry::register`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The client cannot be bound (empty name, empty discovery service name, ...).
    #[error("invalid client reference: {reason}")]
    InvalidReference {
        /// What made the registration unusable.
        reason: String,
    },

    /// The registry was already handed to a running orchestrator.
    #[error("registry is sealed; register clients before run")]
    Sealed,
}

impl RegistrationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistrationError::InvalidReference { .. } => "registration_invalid_reference",
            RegistrationError::Sealed => "registration_sealed",
        }
    }
}

/// # Errors produced by client implementations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClientError {
    /// The options handed to the client are not usable by it.
    #[error("invalid options for client '{client}'")]
    InvalidOptions {
        /// Client that rejected its options.
        client: String,
    },

    /// The client was used before `init` or after `shutdown`.
    #[error("client is not ready")]
    NotReady,

    /// Resolving the discovery binding failed.
    #[error("discovery failed: {0}")]
    Discovery(#[from] ClusterError),

    /// Implementation-specific failure.
    #[error("client failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl ClientError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClientError::InvalidOptions { .. } => "client_invalid_options",
            ClientError::NotReady => "client_not_ready",
            ClientError::Discovery(_) => "client_discovery",
            ClientError::Fail { .. } => "client_failed",
        }
    }
}

/// # Errors produced by service implementations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Service initialization failed.
    #[error("service failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Fail { .. } => "service_failed",
        }
    }
}

/// # Errors produced by the coordination-store collaborator.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The store could not be reached or rejected the request.
    #[error("coordination store unavailable: {error}")]
    Unavailable {
        /// The underlying error message.
        error: String,
    },

    /// The handle (broker/reporter) was already closed.
    #[error("coordination store handle closed")]
    Closed,
}

impl ClusterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClusterError::Unavailable { .. } => "cluster_unavailable",
            ClusterError::Closed => "cluster_closed",
        }
    }
}

/// # Errors produced by transport adapters.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The listener could not bind its address.
    #[error("failed to bind {addr}: {error}")]
    Bind {
        /// Address the adapter tried to bind.
        addr: String,
        /// The underlying error message.
        error: String,
    },

    /// Any other I/O failure while serving.
    #[error("adapter i/o error: {error}")]
    Io {
        /// The underlying error message.
        error: String,
    },
}

impl AdapterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AdapterError::Bind { .. } => "adapter_bind",
            AdapterError::Io { .. } => "adapter_io",
        }
    }
}
