//! # Endpoint directory and per-client discovery state.
//!
//! [`EndpointDirectory`] maps endpoint ID → endpoint. Updates report whether they changed
//! anything so the watcher can skip reconfiguration on redundant membership broadcasts.

use std::collections::HashMap;

use crate::clients::client::OPTIONS_KEY;
use crate::cluster::Endpoint;

/// Endpoint set of one discovery-bound client, keyed by endpoint ID.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointDirectory {
    entries: HashMap<String, Endpoint>,
}

impl EndpointDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from a membership snapshot; later duplicates of an ID win.
    pub fn from_endpoints(endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        let entries = endpoints.into_iter().map(|ep| (ep.id.clone(), ep)).collect();
        Self { entries }
    }

    /// Inserts or replaces `endpoint`.
    ///
    /// Returns `false` (and leaves the directory untouched) when an entry with the same
    /// ID, address and weight is already present.
    pub fn upsert(&mut self, endpoint: Endpoint) -> bool {
        match self.entries.get(&endpoint.id) {
            Some(cached) if cached.same_target(&endpoint) => false,
            _ => {
                self.entries.insert(endpoint.id.clone(), endpoint);
                true
            }
        }
    }

    /// Removes the entry `id`; returns `false` if it was unknown.
    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Endpoint> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of all endpoints, sorted by ID.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut out: Vec<Endpoint> = self.entries.values().cloned().collect();
        out.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        out
    }
}

/// Lifecycle phase of a discovery watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    /// Not bound (never initialized, failed to initialize, or shut down).
    Unbound,
    /// Fetching the first options/endpoint snapshot.
    Resolving,
    /// Initialized and receiving broker events.
    Bound,
}

/// Change notification received from a broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DiscoveryEvent {
    Setenv { key: String, value: String },
    Delenv { key: String },
    UpdateEndpoint(Endpoint),
    DeleteEndpoint { id: String },
}

/// Raw options blob + endpoint directory of one discovery-bound client.
#[derive(Debug)]
pub(crate) struct DiscoveryState {
    pub(crate) phase: WatchState,
    pub(crate) raw: Vec<u8>,
    pub(crate) directory: EndpointDirectory,
}

impl DiscoveryState {
    pub(crate) fn new() -> Self {
        Self {
            phase: WatchState::Unbound,
            raw: Vec::new(),
            directory: EndpointDirectory::new(),
        }
    }

    /// Applies `event`; returns `true` if the client must be reconfigured.
    ///
    /// Keys other than [`OPTIONS_KEY`] are ignored. Options changes always reconfigure,
    /// endpoint changes only when the directory actually changed.
    pub(crate) fn apply(&mut self, event: DiscoveryEvent) -> bool {
        match event {
            DiscoveryEvent::Setenv { key, value } if key == OPTIONS_KEY => {
                self.raw = value.into_bytes();
                true
            }
            DiscoveryEvent::Delenv { key } if key == OPTIONS_KEY => {
                self.raw.clear();
                true
            }
            DiscoveryEvent::Setenv { .. } | DiscoveryEvent::Delenv { .. } => false,
            DiscoveryEvent::UpdateEndpoint(ep) => self.directory.upsert(ep),
            DiscoveryEvent::DeleteEndpoint { id } => self.directory.remove(&id),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.phase = WatchState::Unbound;
        self.raw.clear();
        self.directory.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e1() -> Endpoint {
        Endpoint::new("e1", "10.0.0.1:80", 100)
    }

    #[test]
    fn unchanged_upsert_is_noop() {
        let mut dir = EndpointDirectory::new();
        assert!(dir.upsert(e1()));
        assert!(!dir.upsert(e1()));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn address_or_weight_change_replaces_entry() {
        let mut dir = EndpointDirectory::from_endpoints([e1()]);
        assert!(dir.upsert(Endpoint::new("e1", "10.0.0.1:80", 50)));
        assert!(dir.upsert(Endpoint::new("e1", "10.0.0.9:80", 50)));
        assert_eq!(dir.get("e1"), Some(&Endpoint::new("e1", "10.0.0.9:80", 50)));
    }

    #[test]
    fn removing_unknown_id_leaves_directory_untouched() {
        let mut dir = EndpointDirectory::from_endpoints([e1()]);
        let before = dir.clone();
        assert!(!dir.remove("missing"));
        assert_eq!(dir, before);
        assert!(dir.remove("e1"));
        assert!(dir.is_empty());
    }

    #[test]
    fn endpoints_are_sorted_by_id() {
        let dir = EndpointDirectory::from_endpoints([
            Endpoint::new("b", "10.0.0.2:80", 1),
            Endpoint::new("a", "10.0.0.1:80", 1),
        ]);
        let ids: Vec<_> = dir.endpoints().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn only_options_key_triggers_reconfiguration() {
        let mut state = DiscoveryState::new();
        assert!(!state.apply(DiscoveryEvent::Setenv {
            key: "region".into(),
            value: "eu".into()
        }));
        assert!(state.apply(DiscoveryEvent::Setenv {
            key: OPTIONS_KEY.into(),
            value: "{}".into()
        }));
        assert_eq!(state.raw, b"{}");
        assert!(state.apply(DiscoveryEvent::Delenv {
            key: OPTIONS_KEY.into()
        }));
        assert!(state.raw.is_empty());
    }

    #[test]
    fn endpoint_events_follow_directory_changes() {
        let mut state = DiscoveryState::new();
        assert!(state.apply(DiscoveryEvent::UpdateEndpoint(e1())));
        assert!(!state.apply(DiscoveryEvent::UpdateEndpoint(e1())));
        assert!(!state.apply(DiscoveryEvent::DeleteEndpoint {
            id: "missing".into()
        }));
        assert!(state.apply(DiscoveryEvent::DeleteEndpoint { id: "e1".into() }));
    }
}
