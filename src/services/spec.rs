//! # Service setup bundle.
//!
//! [`ServiceSpec`] bundles what `Orchestrator::setup` needs to host a service:
//! the service itself, a free-form description (shown in the overview) and, optionally,
//! the [`Reporting`] parameters used to advertise the service while it runs.

use std::fmt;

use crate::services::service::ServiceRef;

/// Liveness advertisement of a running service.
///
/// When set, the orchestrator acquires a reporter for the service right after the start
/// barrier opens, sends one `keepalive(addr, weight, ttl)` and closes the reporter once
/// `run` returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reporting {
    /// Advertised address.
    pub addr: String,
    /// Balancing weight.
    pub weight: u32,
    /// Registration time-to-live, in seconds.
    pub ttl: u64,
}

/// Service registration passed to `Orchestrator::setup`.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use hostvisor::{ServiceFn, ServiceSpec};
///
/// let svc = ServiceFn::arc("api", |ctx: CancellationToken| async move { ctx.cancelled().await });
/// let spec = ServiceSpec::new(svc, "public API").with_auto_report("10.0.0.7:8080", 100, 10);
///
/// assert_eq!(spec.name(), "api");
/// assert_eq!(spec.reporting().map(|r| r.weight), Some(100));
/// ```
#[derive(Clone)]
pub struct ServiceSpec {
    service: ServiceRef,
    description: String,
    reporting: Option<Reporting>,
}

impl ServiceSpec {
    /// Creates a spec without liveness reporting.
    pub fn new(service: ServiceRef, description: impl Into<String>) -> Self {
        Self {
            service,
            description: description.into(),
            reporting: None,
        }
    }

    /// Enables liveness reporting with `addr`, `weight` and `ttl` (seconds).
    pub fn with_auto_report(mut self, addr: impl Into<String>, weight: u32, ttl: u64) -> Self {
        self.reporting = Some(Reporting {
            addr: addr.into(),
            weight,
            ttl,
        });
        self
    }

    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    /// Convenience: returns the service name.
    pub fn name(&self) -> &str {
        self.service.name()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reporting(&self) -> Option<&Reporting> {
        self.reporting.as_ref()
    }
}

impl fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("name", &self.name())
            .field("description", &self.description)
            .field("reporting", &self.reporting)
            .finish()
    }
}
