//! # Service abstractions and setup bundles.
//!
//! - [`Service`] - trait for long-running, context-aware workloads
//! - [`ServiceFn`] - closure-backed service implementation
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)
//! - [`ServiceSpec`] - a service plus its description and optional liveness reporting

mod service;
mod service_fn;
mod spec;

pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
pub use spec::{Reporting, ServiceSpec};
