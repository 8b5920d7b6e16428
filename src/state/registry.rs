// Client registry
// Tracks every known playback agent and when it was last heard from

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::time::Instant;

/// Unique identifier for a playback agent
///
/// Supplied by the agent itself; the server never generates one.
pub type ClientId = String;

/// Last-heartbeat bookkeeping for a single client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// Monotonic time of the last request, used for liveness decisions
    pub at: Instant,
    /// Wall-clock time of the last request, reported to operators
    pub wall: DateTime<Utc>,
}

/// Registry of connected clients (id -> last heartbeat)
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Heartbeat>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record "now" as the client's last heartbeat
    /// Returns true if the client was not registered before
    pub fn touch(&mut self, id: &str) -> bool {
        self.touch_at(id, Instant::now(), Utc::now())
    }

    /// Record a heartbeat with explicit timestamps
    ///
    /// Neither timestamp ever moves backwards for a registered client, so a
    /// late-arriving request cannot make an agent look older than it is.
    pub fn touch_at(&mut self, id: &str, at: Instant, wall: DateTime<Utc>) -> bool {
        if let Some(heartbeat) = self.clients.get_mut(id) {
            heartbeat.at = heartbeat.at.max(at);
            heartbeat.wall = heartbeat.wall.max(wall);
            false
        } else {
            self.clients.insert(id.to_string(), Heartbeat { at, wall });
            true
        }
    }

    /// Snapshot of all registered client IDs, sorted
    pub fn list_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.clients.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Last heartbeat of a client, if registered
    pub fn last_seen(&self, id: &str) -> Option<Heartbeat> {
        self.clients.get(id).copied()
    }

    /// Whether the client is currently registered
    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    /// Remove a client from the registry
    ///
    /// Only removes the registry entry. Use `AppState::evict` to drop the
    /// client's queue and state in the same operation.
    pub fn evict(&mut self, id: &str) -> Option<Heartbeat> {
        self.clients.remove(id)
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
