//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (orchestrator phases,
//! service tasks, discovery watchers).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                      Subscriber (one):
//!   Orchestrator ──┐
//!   Service task ──┼──────► Bus ───────► subscriber_listener ────► SubscriberSet
//!   Watcher      ──┘  (broadcast chan)     (in Orchestrator)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_only_see_events_after_subscribe() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::StartReleased));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ServiceStarting).with_name("api"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::ServiceStarting);
        assert_eq!(ev.name.as_deref(), Some("api"));
    }
}
