// State management module
// Handles the client registry, command queues and per-client device state

pub mod app_state;
pub mod commands;
pub mod registry;
pub mod store;

pub use app_state::{AppState, ClientSnapshot, SharedState};
pub use commands::{CommandQueue, QueuedCommand};
pub use registry::{ClientId, ClientRegistry, Heartbeat};
pub use store::{ClientStateMap, StateStore, TRACK_KEY, VOLUME_KEY};
