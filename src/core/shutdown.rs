//! # OS signal listener for a run.
//!
//! When `Config::shutdown_on_signal` is set, `Orchestrator::run` spawns
//! [`spawn_signal_listener`]. The first termination signal publishes
//! `ShutdownRequested` and cancels the run context; the listener exits on its own once
//! the run context is cancelled for any other reason.
//!
//! ## Signals
//! - Unix: `SIGINT`, `SIGTERM`, `SIGQUIT`
//! - Other platforms: Ctrl-C via [`tokio::signal::ctrl_c`]

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};

/// Spawns the listener bound to `run_ctx`.
pub(crate) fn spawn_signal_listener(bus: Bus, run_ctx: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = run_ctx.cancelled() => {}
            res = wait_for_shutdown_signal() => match res {
                Ok(()) => {
                    tracing::info!("termination signal received, cancelling run");
                    bus.publish(Event::new(EventKind::ShutdownRequested));
                    run_ctx.cancel();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "signal handlers unavailable");
                }
            },
        }
    })
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_exits_with_the_run() {
        let ctx = CancellationToken::new();
        let handle = spawn_signal_listener(Bus::new(4), ctx.clone());
        ctx.cancel();
        handle.await.expect("listener must exit cleanly");
    }
}
