//! Playback Control Library
//!
//! Control plane for a fleet of remote playback agents. This library exposes
//! the server core (state, dispatch, liveness) and the agent-side client.
//! The server binary is in `src/main.rs`, the agent in `src/bin/playback_agent.rs`.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod liveness;
pub mod server;
/// Application state management
///
/// Handles the client registry, command queues and per-client device state.
pub mod state;
