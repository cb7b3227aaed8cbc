//! # Service lifecycle: prepare, then gated run.
//!
//! ```text
//! Registered ──prepare: init()──Ok──► Prepared ──barrier──► Running ──run returns──► ShutDown
//!                         │                   │
//!                         └─Err─► run aborted  └─ctx cancelled first─► exits, never runs
//! ```
//!
//! ## Running a prepared service
//! ```text
//! barrier.wait(ctx) ──false──► return
//!        │ true
//!        ▼
//! reporting? ──► cluster.new_reporter(name) ──► keepalive(addr, weight, ttl)
//!        │            (failures: ReporterFailed, service still runs)
//!        ▼
//! publish ServiceStarting ──► run(ctx)  (unwinds are caught)
//!        ▼
//! reporter.close(ctx)       (every exit path once acquired)
//!        ▼
//! returned: shutdown(ctx) + ServiceStopped
//! panicked: ServicePanicked
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::cluster::{Cluster, Reporter};
use crate::core::barrier::StartBarrier;
use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};
use crate::services::{Reporting, ServiceSpec};
use crate::subscribers::panic_message;

/// Runs the service's `init`, publishing the outcome.
pub(crate) async fn prepare(
    spec: &ServiceSpec,
    ctx: &CancellationToken,
    bus: &Bus,
) -> Result<(), ServiceError> {
    let name = spec.name();
    match spec.service().init(ctx.clone()).await {
        Ok(()) => {
            tracing::debug!(service = name, "service prepared");
            bus.publish(Event::new(EventKind::ServicePrepared).with_name(name));
            Ok(())
        }
        Err(e) => {
            tracing::error!(service = name, error = %e, "service prepare failed");
            bus.publish(
                Event::new(EventKind::ServicePrepareFailed)
                    .with_name(name)
                    .with_reason(e.to_string()),
            );
            Err(e)
        }
    }
}

/// Body of a prepared service's task.
pub(crate) async fn boot(
    spec: ServiceSpec,
    ctx: CancellationToken,
    barrier: StartBarrier,
    cluster: Arc<dyn Cluster>,
    bus: Bus,
) {
    let name = spec.name().to_string();
    if !barrier.wait(&ctx).await {
        tracing::debug!(service = %name, "cancelled before start");
        return;
    }

    let reporter = match spec.reporting() {
        Some(reporting) => attach_reporter(&name, reporting, cluster.as_ref(), &bus).await,
        None => None,
    };

    tracing::info!(service = %name, "service starting");
    bus.publish(Event::new(EventKind::ServiceStarting).with_name(name.as_str()));

    let service = Arc::clone(spec.service());
    let outcome = AssertUnwindSafe(service.run(ctx.clone()))
        .catch_unwind()
        .await;

    if let Some(reporter) = reporter {
        reporter.close(ctx.clone()).await;
    }

    match outcome {
        Ok(()) => {
            service.shutdown(ctx).await;
            tracing::info!(service = %name, "service stopped");
            bus.publish(Event::new(EventKind::ServiceStopped).with_name(name));
        }
        Err(payload) => {
            let info = panic_message(payload.as_ref());
            tracing::error!(service = %name, panic = %info, "service panicked");
            bus.publish(
                Event::new(EventKind::ServicePanicked)
                    .with_name(name)
                    .with_reason(info),
            );
        }
    }
}

/// Acquires a reporter and advertises the service once.
///
/// A reporter whose keepalive failed is still returned so it gets closed.
async fn attach_reporter(
    name: &str,
    reporting: &Reporting,
    cluster: &dyn Cluster,
    bus: &Bus,
) -> Option<Arc<dyn Reporter>> {
    let reporter = match cluster.new_reporter(name).await {
        Ok(r) => r,
        Err(e) => {
            publish_reporter_failed(bus, name, &e.to_string());
            return None;
        }
    };
    if let Err(e) = reporter
        .keepalive(&reporting.addr, reporting.weight, reporting.ttl)
        .await
    {
        publish_reporter_failed(bus, name, &e.to_string());
    } else {
        tracing::debug!(
            service = name,
            addr = %reporting.addr,
            weight = reporting.weight,
            ttl = reporting.ttl,
            "service reported"
        );
    }
    Some(reporter)
}

fn publish_reporter_failed(bus: &Bus, name: &str, reason: &str) {
    tracing::warn!(service = name, error = reason, "liveness reporting failed");
    bus.publish(
        Event::new(EventKind::ReporterFailed)
            .with_name(name)
            .with_reason(reason),
    );
}
