// State store
// Last-known device state reported for (or pushed to) each client

use super::registry::ClientId;
use std::collections::HashMap;

/// Key under which the current track is stored
pub const TRACK_KEY: &str = "Track";
/// Key under which the current volume is stored
pub const VOLUME_KEY: &str = "Volume";

/// Open-schema device state (key -> value)
pub type ClientStateMap = HashMap<String, String>;

/// Device state for every client (id -> state map)
#[derive(Debug, Default)]
pub struct StateStore {
    states: HashMap<ClientId, ClientStateMap>,
}

impl StateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty state map for the client if it has none
    pub fn ensure(&mut self, id: &str) -> &mut ClientStateMap {
        self.states.entry(id.to_string()).or_default()
    }

    /// Set a single key, overwriting any previous value
    pub fn set(&mut self, id: &str, key: impl Into<String>, value: impl Into<String>) {
        self.ensure(id).insert(key.into(), value.into());
    }

    /// Set several keys at once; later pairs win over earlier ones
    pub fn set_many<I>(&mut self, id: &str, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.ensure(id).extend(pairs);
    }

    /// State of a client, if any has been recorded
    pub fn get(&self, id: &str) -> Option<&ClientStateMap> {
        self.states.get(id)
    }

    /// Whether a state map exists for the client
    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    /// Drop the client's state entirely
    pub fn remove(&mut self, id: &str) -> Option<ClientStateMap> {
        self.states.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites() {
        let mut store = StateStore::new();
        store.set("a1", TRACK_KEY, "3");
        store.set("a1", TRACK_KEY, "4");
        assert_eq!(store.get("a1").unwrap().get(TRACK_KEY).unwrap(), "4");
    }

    #[test]
    fn test_set_many_last_pair_wins() {
        let mut store = StateStore::new();
        store.set_many(
            "a1",
            vec![
                ("mode".to_string(), "shuffle".to_string()),
                ("mode".to_string(), "repeat".to_string()),
                ("Volume".to_string(), "11".to_string()),
            ],
        );

        let state = store.get("a1").unwrap();
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("mode").unwrap(), "repeat");
        assert_eq!(state.get(VOLUME_KEY).unwrap(), "11");
    }

    #[test]
    fn test_get_missing() {
        let store = StateStore::new();
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn test_remove() {
        let mut store = StateStore::new();
        store.ensure("a1");
        assert!(store.contains("a1"));
        assert!(store.remove("a1").is_some());
        assert!(!store.contains("a1"));
    }
}
