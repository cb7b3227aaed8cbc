//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the orchestrator runtime.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `watcher_capacity = 0` → clamped to 1

/// Global configuration for the orchestrator runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `watcher_capacity`: Per-client discovery event queue size (min 1)
/// - `shutdown_on_signal`: Cancel the run context on SIGINT/SIGTERM/SIGQUIT
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// skip older items.
    pub bus_capacity: usize,

    /// Capacity of each discovery watcher's event queue.
    ///
    /// When the queue is full the broker's delivery waits for the watcher to catch up,
    /// so a slow `reinit` applies backpressure to that one client only.
    pub watcher_capacity: usize,

    /// Whether `run` listens for OS termination signals.
    ///
    /// On a signal the run context is cancelled. Cancellation is advisory: prepared
    /// services never start, running services must observe the token themselves.
    pub shutdown_on_signal: bool,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a watcher queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn watcher_capacity_clamped(&self) -> usize {
        self.watcher_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `watcher_capacity = 64` (configuration changes are operator-paced)
    /// - `shutdown_on_signal = false`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            watcher_capacity: 64,
            shutdown_on_signal: false,
        }
    }
}
