//! # One-shot start barrier.
//!
//! [`StartBarrier`] is released exactly once and wakes every waiter at the same time.
//! It cannot be re-armed. Waiters also observe their own cancellation token:
//!
//! ```text
//! wait(ctx):
//!   ctx cancelled first ─────────► false   (service never enters run)
//!   barrier released  ─────────► true
//!   both ready       ─────────► false   (cancellation wins)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// One-shot, multi-waiter broadcast signal.
///
/// Clones share the same barrier.
///
/// ## Example
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use tokio_util::sync::CancellationToken;
/// use hostvisor::StartBarrier;
///
/// let barrier = StartBarrier::new();
/// let waiter = barrier.clone();
/// let ctx = CancellationToken::new();
/// let h = tokio::spawn(async move { waiter.wait(&ctx).await });
///
/// assert!(barrier.release());
/// assert!(!barrier.release());
/// assert!(h.await.unwrap());
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct StartBarrier {
    gate: CancellationToken,
    released: Arc<AtomicBool>,
}

impl StartBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the barrier; returns `true` only for the call that actually opened it.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.gate.cancel();
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Waits for the barrier or for `ctx`; returns `true` if the barrier opened.
    pub async fn wait(&self, ctx: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => false,
            _ = self.gate.cancelled() => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn release_wakes_every_waiter() {
        let barrier = StartBarrier::new();
        let ctx = CancellationToken::new();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let b = barrier.clone();
            let c = ctx.clone();
            handles.push(tokio::spawn(async move { b.wait(&c).await }));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!barrier.is_released());
        assert!(barrier.release());

        for h in handles {
            assert!(h.await.expect("join"));
        }
    }

    #[tokio::test]
    async fn cancellation_before_release_exits_waiter() {
        let barrier = StartBarrier::new();
        let ctx = CancellationToken::new();
        let (b, c) = (barrier.clone(), ctx.clone());
        let h = tokio::spawn(async move { b.wait(&c).await });

        ctx.cancel();
        assert!(!h.await.expect("join"));
    }

    #[tokio::test]
    async fn cancellation_wins_over_release() {
        let barrier = StartBarrier::new();
        let ctx = CancellationToken::new();
        barrier.release();
        ctx.cancel();
        assert!(!barrier.wait(&ctx).await);
    }

    #[tokio::test]
    async fn late_waiter_passes_released_barrier() {
        let barrier = StartBarrier::new();
        assert!(barrier.release());
        assert!(barrier.wait(&CancellationToken::new()).await);
    }
}
