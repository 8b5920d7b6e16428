// Application state management
// Aggregates the client registry, command queues and device state behind
// a single lock so every cross-store update is atomic to readers

use super::commands::{CommandQueue, QueuedCommand};
use super::registry::{ClientId, ClientRegistry};
use super::store::{ClientStateMap, StateStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;

/// Application state shared between request handlers and the liveness monitor
pub type SharedState = Arc<RwLock<AppState>>;

/// Point-in-time view of a single client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    /// Identifier of the client
    pub client_id: ClientId,
    /// Wall-clock time of the last request carrying this client's ID
    pub last_heartbeat: DateTime<Utc>,
    /// Device state (the full map for queries, the applied pairs for updates)
    pub state: ClientStateMap,
}

/// Main application state
///
/// A client exists in all three stores or in none of them. Every method
/// that can register or remove a client updates the three together.
#[derive(Debug, Default)]
pub struct AppState {
    registry: ClientRegistry,
    commands: CommandQueue,
    states: StateStore,
}

impl AppState {
    /// Create an empty application state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty application state wrapped for sharing
    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Read access to the client registry
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Read access to the command queues
    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    /// Read access to the device state store
    pub fn states(&self) -> &StateStore {
        &self.states
    }

    /// Refresh a client's heartbeat, registering it if unknown
    /// Returns true if the client was newly registered
    pub fn touch(&mut self, id: &str) -> bool {
        self.touch_at(id, Instant::now(), Utc::now())
    }

    /// Refresh a client's heartbeat with explicit timestamps
    pub fn touch_at(&mut self, id: &str, at: Instant, wall: DateTime<Utc>) -> bool {
        let registered = self.registry.touch_at(id, at, wall);
        if registered {
            self.commands.ensure(id);
            self.states.ensure(id);
            info!(client_id = %id, clients = self.registry.len(), "New client connected");
        }
        registered
    }

    /// Whether the client is currently registered
    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Snapshot of all registered client IDs
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.registry.list_ids()
    }

    /// Number of registered clients
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Current view of a client, or None if it is not registered
    pub fn client_snapshot(&self, id: &str) -> Option<ClientSnapshot> {
        let heartbeat = self.registry.last_seen(id)?;
        Some(ClientSnapshot {
            client_id: id.to_string(),
            last_heartbeat: heartbeat.wall,
            state: self.states.get(id).cloned().unwrap_or_default(),
        })
    }

    /// Refresh the client and merge the given pairs into its state
    /// Returns the applied pairs along with the refreshed heartbeat
    pub fn apply_state(&mut self, id: &str, pairs: Vec<(String, String)>) -> ClientSnapshot {
        self.touch(id);
        let applied: ClientStateMap = pairs.iter().cloned().collect();
        self.states.set_many(id, pairs);

        let last_heartbeat = self
            .registry
            .last_seen(id)
            .map_or_else(Utc::now, |heartbeat| heartbeat.wall);
        ClientSnapshot {
            client_id: id.to_string(),
            last_heartbeat,
            state: applied,
        }
    }

    /// Refresh the client, record `state_key = argument` and queue the command
    pub fn queue_command(&mut self, id: &str, state_key: &str, command: QueuedCommand) {
        self.touch(id);
        self.states.set(id, state_key, command.argument.clone());
        self.commands.enqueue(id, command);
    }

    /// Refresh the client and take all of its pending commands
    pub fn poll(&mut self, id: &str) -> Vec<QueuedCommand> {
        self.touch(id);
        self.commands.drain(id)
    }

    /// Remove a client from the registry, its queue and its state
    /// Returns true if the client was registered
    pub fn evict(&mut self, id: &str) -> bool {
        let registered = self.registry.evict(id).is_some();
        let dropped = self.commands.remove(id).map_or(0, |queue| queue.len());
        self.states.remove(id);
        if registered {
            info!(client_id = %id, dropped_commands = dropped, "Client removed");
        }
        registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::store::{TRACK_KEY, VOLUME_KEY};

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new();
        assert_eq!(state.client_count(), 0);
        assert!(state.client_ids().is_empty());
    }

    #[test]
    fn test_touch_registers_in_all_stores() {
        let mut state = AppState::new();
        assert!(state.touch("a1"));
        assert!(state.registry().contains("a1"));
        assert!(state.commands().contains("a1"));
        assert!(state.states().contains("a1"));
        assert!(!state.touch("a1"));
    }

    #[test]
    fn test_queue_command_sets_state_and_enqueues() {
        let mut state = AppState::new();
        state.queue_command("a1", TRACK_KEY, QueuedCommand::new("CHANGE_TRACK", "7"));

        assert!(state.contains("a1"));
        let snapshot = state.client_snapshot("a1").unwrap();
        assert_eq!(snapshot.state.get(TRACK_KEY).unwrap(), "7");
        assert_eq!(
            state.poll("a1"),
            vec![QueuedCommand::new("CHANGE_TRACK", "7")]
        );
        assert!(state.poll("a1").is_empty());
    }

    #[test]
    fn test_apply_state_echoes_applied_pairs() {
        let mut state = AppState::new();
        state.queue_command("a1", VOLUME_KEY, QueuedCommand::new("CHANGE_VOLUME", "5"));

        let echo = state.apply_state("a1", vec![("mode".to_string(), "shuffle".to_string())]);
        assert_eq!(echo.client_id, "a1");
        assert_eq!(echo.state.len(), 1);
        assert_eq!(echo.state.get("mode").unwrap(), "shuffle");

        // The stored state keeps earlier keys too
        let snapshot = state.client_snapshot("a1").unwrap();
        assert_eq!(snapshot.state.get(VOLUME_KEY).unwrap(), "5");
        assert_eq!(snapshot.state.get("mode").unwrap(), "shuffle");
    }

    #[test]
    fn test_client_snapshot_unknown() {
        let state = AppState::new();
        assert!(state.client_snapshot("ghost").is_none());
    }

    #[test]
    fn test_evict_removes_from_all_stores() {
        let mut state = AppState::new();
        state.queue_command("a1", TRACK_KEY, QueuedCommand::new("CHANGE_TRACK", "1"));
        state.touch("a2");

        assert!(state.evict("a1"));
        assert!(!state.registry().contains("a1"));
        assert!(!state.commands().contains("a1"));
        assert!(!state.states().contains("a1"));
        assert!(state.client_snapshot("a1").is_none());
        assert_eq!(state.client_ids(), vec!["a2"]);

        assert!(!state.evict("a1"));
    }

    #[test]
    fn test_reregistration_starts_fresh() {
        let mut state = AppState::new();
        state.queue_command("a1", TRACK_KEY, QueuedCommand::new("CHANGE_TRACK", "1"));
        state.evict("a1");

        assert!(state.touch("a1"));
        assert!(state.client_snapshot("a1").unwrap().state.is_empty());
        assert!(state.poll("a1").is_empty());
    }
}
