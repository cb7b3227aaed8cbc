//! # Function-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a closure `F: Fn(CancellationToken) -> Fut` as a [`Service`] whose
//! `init` always succeeds and whose `shutdown` does nothing.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use hostvisor::{ServiceFn, ServiceRef};
//!
//! let s: ServiceRef = ServiceFn::arc("banner", |_ctx: CancellationToken| async move {
//!     println!("hello");
//! });
//!
//! assert_eq!(s.name(), "banner");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::services::service::Service;

/// Name given to a [`ServiceFn`] created with [`ServiceFn::unnamed`].
pub const DEFAULT_SERVICE_FN_NAME: &str = "service-run-function";

/// Function-backed service implementation.
#[derive(Debug)]
pub struct ServiceFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ServiceFn<F> {
    /// Creates a new function-backed service.
    ///
    /// Prefer [`ServiceFn::arc`] when you immediately need a [`ServiceRef`](crate::ServiceRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates a service named `service-run-function`.
    pub fn unnamed(f: F) -> Self {
        Self::new(DEFAULT_SERVICE_FN_NAME, f)
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, _ctx: CancellationToken) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn run(&self, ctx: CancellationToken) {
        (self.f)(ctx).await
    }

    async fn shutdown(&self, _ctx: CancellationToken) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn each_run_calls_the_closure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let svc = ServiceFn::unnamed(move |_ctx: CancellationToken| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(svc.name(), DEFAULT_SERVICE_FN_NAME);

        let ctx = CancellationToken::new();
        svc.init(ctx.clone()).await.expect("init never fails");
        svc.run(ctx.clone()).await;
        svc.run(ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
