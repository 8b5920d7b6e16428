//! API handlers for the control plane
//!
//! This module contains the HTTP request handlers. Agents and operators share
//! one endpoint that takes a plain-text command line; the health endpoint is
//! the only other route.

use super::command::Command;
use super::dispatcher::{self, DispatchResponse};
use crate::error::AppError;
use crate::state::SharedState;
use axum::{extract::State, response::Json};
use serde::Serialize;
use tracing::{debug, warn};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status indicator
    pub status: String,
    /// Crate version
    pub version: String,
    /// Number of registered clients
    pub clients: usize,
}

/// POST / - Execute a command line
pub async fn handle_command(
    State(state): State<SharedState>,
    body: String,
) -> Result<DispatchResponse, AppError> {
    let command = Command::parse(&body).map_err(|e| {
        warn!(error = %e, "Rejected command");
        e
    })?;

    debug!(
        command = command.name(),
        client_id = command.client_id().unwrap_or("-"),
        "Dispatching command"
    );
    dispatcher::dispatch(&state, command).await
}

/// GET /api/health - Health check
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let clients = state.read().await.client_count();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        clients,
    })
}
