//! # Transport adapters.
//!
//! An [`Adapter`] is a network listener (TCP, UDP, HTTP...) exposing a uniform
//! start/stop/shutdown contract. The runtime does not implement any listener itself;
//! it only knows how to host one:
//!
//! - [`ListenerHandle`] runs [`Adapter::start`] in the background (`async_start`) and
//!   lets the caller [`wait`](ListenerHandle::wait) for it.
//! - [`ListenerService`] hosts an adapter as a [`Service`]: `run` serves until the
//!   context is cancelled, then stops the adapter; `shutdown` shuts it down.
//!
//! ```text
//! ListenerService::run(ctx)
//!   ListenerHandle::async_start(adapter, ctx, addr) ──► start(ctx, addr) serving...
//!   ├─ start returned on its own ──────────────────► done
//!   └─ ctx cancelled ──► adapter.stop() ──► wait() for start to return
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{AdapterError, ServiceError};
use crate::services::Service;

/// Uniform contract of a network listener.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Binds `addr` and serves until stopped; returns once serving has ended.
    async fn start(&self, ctx: CancellationToken, addr: &str) -> Result<(), AdapterError>;

    /// Stops accepting and makes a pending `start` return.
    async fn stop(&self, ctx: CancellationToken) -> Result<(), AdapterError>;

    /// Releases the listener's resources.
    fn shutdown(&self);
}

/// Background `start` of an adapter.
pub struct ListenerHandle {
    addr: String,
    task: Option<JoinHandle<Result<(), AdapterError>>>,
}

impl ListenerHandle {
    /// Spawns `adapter.start(ctx, addr)` and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn async_start<A: Adapter + ?Sized>(
        adapter: Arc<A>,
        ctx: CancellationToken,
        addr: impl Into<String>,
    ) -> Self {
        let addr = addr.into();
        let bind = addr.clone();
        let task = tokio::spawn(async move { adapter.start(ctx, &bind).await });
        Self {
            addr,
            task: Some(task),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// True once `start` has returned (or `wait` already consumed its result).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for `start` to return and yields its result.
    ///
    /// Cancel-safe. After the result has been taken, further calls return `Ok(())`.
    pub async fn wait(&mut self) -> Result<(), AdapterError> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let joined = task.await;
        self.task = None;
        match joined {
            Ok(res) => res,
            Err(e) => Err(AdapterError::Io {
                error: format!("listener task on {} ended abnormally: {e}", self.addr),
            }),
        }
    }
}

/// Hosts an [`Adapter`] bound to one address as a [`Service`].
pub struct ListenerService<A: ?Sized> {
    name: String,
    addr: String,
    adapter: Arc<A>,
}

impl<A: Adapter + ?Sized> ListenerService<A> {
    pub fn new(name: impl Into<String>, adapter: Arc<A>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            adapter,
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<String>, adapter: Arc<A>, addr: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name, adapter, addr))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl<A: Adapter + ?Sized> Service for ListenerService<A> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, _ctx: CancellationToken) -> Result<(), ServiceError> {
        if self.addr.is_empty() {
            return Err(ServiceError::Fail {
                error: format!("listener '{}' has no address", self.name),
            });
        }
        Ok(())
    }

    async fn run(&self, ctx: CancellationToken) {
        let mut handle =
            ListenerHandle::async_start(Arc::clone(&self.adapter), ctx.child_token(), &self.addr);
        tracing::info!(listener = %self.name, addr = %self.addr, "listener started");

        let res = tokio::select! {
            res = handle.wait() => res,
            _ = ctx.cancelled() => {
                if let Err(e) = self.adapter.stop(CancellationToken::new()).await {
                    tracing::warn!(listener = %self.name, error = %e, "listener stop failed");
                }
                handle.wait().await
            }
        };
        match res {
            Ok(()) => tracing::info!(listener = %self.name, "listener stopped"),
            Err(e) => tracing::error!(
                listener = %self.name,
                error = %e,
                label = e.as_label(),
                "listener failed"
            ),
        }
    }

    async fn shutdown(&self, _ctx: CancellationToken) {
        self.adapter.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeListener {
        stopped: CancellationToken,
        starts: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    #[async_trait]
    impl Adapter for FakeListener {
        async fn start(&self, _ctx: CancellationToken, addr: &str) -> Result<(), AdapterError> {
            if addr == "bad" {
                return Err(AdapterError::Bind {
                    addr: addr.into(),
                    error: "address in use".into(),
                });
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.stopped.cancelled().await;
            Ok(())
        }

        async fn stop(&self, _ctx: CancellationToken) -> Result<(), AdapterError> {
            self.stopped.cancel();
            Ok(())
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn handle_reports_bind_errors() {
        let adapter = Arc::new(FakeListener::default());
        let mut handle = ListenerHandle::async_start(adapter, CancellationToken::new(), "bad");
        let err = handle.wait().await.expect_err("bind must fail");
        assert_eq!(err.as_label(), "adapter_bind");
        assert!(handle.is_finished());
        assert!(handle.wait().await.is_ok());
    }

    #[tokio::test]
    async fn service_stops_adapter_on_cancel() {
        let adapter = Arc::new(FakeListener::default());
        let svc = ListenerService::arc("tcp", adapter.clone(), "127.0.0.1:0");
        let ctx = CancellationToken::new();
        svc.init(ctx.clone()).await.expect("init");

        let runner = {
            let svc = svc.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { svc.run(ctx).await })
        };
        while adapter.starts.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        ctx.cancel();
        runner.await.expect("run returns after cancel");
        assert!(adapter.stopped.is_cancelled());

        svc.shutdown(ctx).await;
        assert_eq!(adapter.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_address_fails_prepare() {
        let svc = ListenerService::new("tcp", Arc::new(FakeListener::default()), "");
        assert!(svc.init(CancellationToken::new()).await.is_err());
    }
}
