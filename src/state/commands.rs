// Command queue
// Per-client FIFO of operator commands waiting for the next poll

use super::registry::ClientId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A command queued for a client
///
/// Serialized as a two-element array `[name, argument]`, the shape agents
/// receive from `POLL_COMMANDS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct QueuedCommand {
    /// Command name (e.g. "CHANGE_TRACK")
    pub name: String,
    /// Command argument (e.g. the track number)
    pub argument: String,
}

impl QueuedCommand {
    /// Create a queued command
    pub fn new(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: argument.into(),
        }
    }
}

impl From<(String, String)> for QueuedCommand {
    fn from((name, argument): (String, String)) -> Self {
        Self { name, argument }
    }
}

impl From<QueuedCommand> for (String, String) {
    fn from(command: QueuedCommand) -> Self {
        (command.name, command.argument)
    }
}

/// Pending commands for every client (id -> ordered commands)
///
/// Queues are unbounded: an agent that never polls keeps accumulating
/// commands until the liveness monitor evicts it.
#[derive(Debug, Default)]
pub struct CommandQueue {
    queues: HashMap<ClientId, Vec<QueuedCommand>>,
}

impl CommandQueue {
    /// Create an empty set of queues
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue for the client if it has none
    pub fn ensure(&mut self, id: &str) {
        if !self.queues.contains_key(id) {
            self.queues.insert(id.to_string(), Vec::new());
        }
    }

    /// Append a command to the client's queue, creating the queue if absent
    pub fn enqueue(&mut self, id: &str, command: QueuedCommand) {
        self.ensure(id);
        if let Some(queue) = self.queues.get_mut(id) {
            queue.push(command);
        }
    }

    /// Take every pending command for the client, leaving the queue empty
    pub fn drain(&mut self, id: &str) -> Vec<QueuedCommand> {
        self.queues
            .get_mut(id)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Number of commands waiting for the client
    pub fn pending(&self, id: &str) -> usize {
        self.queues.get(id).map_or(0, Vec::len)
    }

    /// Whether a queue exists for the client
    pub fn contains(&self, id: &str) -> bool {
        self.queues.contains_key(id)
    }

    /// Drop the client's queue entirely
    pub fn remove(&mut self, id: &str) -> Option<Vec<QueuedCommand>> {
        self.queues.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_and_empties_queue() {
        let mut queue = CommandQueue::new();
        for track in ["1", "2", "3"] {
            queue.enqueue("a1", QueuedCommand::new("CHANGE_TRACK", track));
        }
        assert_eq!(queue.pending("a1"), 3);

        let drained = queue.drain("a1");
        let tracks: Vec<&str> = drained.iter().map(|c| c.argument.as_str()).collect();
        assert_eq!(tracks, vec!["1", "2", "3"]);

        assert!(queue.drain("a1").is_empty());
        assert!(queue.contains("a1"));
    }

    #[test]
    fn test_drain_unknown_client() {
        let mut queue = CommandQueue::new();
        assert!(queue.drain("ghost").is_empty());
        assert!(!queue.contains("ghost"));
    }

    #[test]
    fn test_queues_are_isolated() {
        let mut queue = CommandQueue::new();
        queue.enqueue("a1", QueuedCommand::new("CHANGE_VOLUME", "10"));
        queue.enqueue("a2", QueuedCommand::new("CHANGE_VOLUME", "20"));

        assert_eq!(
            queue.drain("a1"),
            vec![QueuedCommand::new("CHANGE_VOLUME", "10")]
        );
        assert_eq!(queue.pending("a2"), 1);
    }

    #[test]
    fn test_queued_command_serializes_as_pair() {
        let command = QueuedCommand::new("CHANGE_TRACK", "7");
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(json, r#"["CHANGE_TRACK","7"]"#);

        let parsed: QueuedCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, command);
    }
}
