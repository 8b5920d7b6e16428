//! Command dispatch
//!
//! Routes a parsed `Command` to the application state and produces the
//! response payload. Every command carrying a client ID registers that client
//! if it is unknown, except `GET_CLIENT_STATE`, which only reads.

use super::command::{Command, CHANGE_TRACK, CHANGE_VOLUME};
use crate::error::AppError;
use crate::state::{ClientId, ClientSnapshot, QueuedCommand, SharedState, TRACK_KEY, VOLUME_KEY};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::debug;

/// Acknowledgement sent for `HEARTBEAT`
pub const HEARTBEAT_ACK: &str = "Heartbeat received";

/// Successful outcome of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResponse {
    /// Plain-text acknowledgement
    Text(String),
    /// Registered client IDs
    Clients(Vec<ClientId>),
    /// Commands drained for a polling agent
    Commands(Vec<QueuedCommand>),
    /// A client's state (full state for queries, applied pairs for updates)
    ClientState(ClientSnapshot),
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Text(text) => (StatusCode::OK, text).into_response(),
            Self::Clients(clients) => Json(clients).into_response(),
            Self::Commands(commands) => Json(commands).into_response(),
            Self::ClientState(snapshot) => Json(snapshot).into_response(),
        }
    }
}

/// Execute a command against the shared state
///
/// Each command takes the state lock once, so the store updates it makes
/// (e.g. state + queue for `CHANGE_TRACK`) are seen together or not at all.
pub async fn dispatch(state: &SharedState, command: Command) -> Result<DispatchResponse, AppError> {
    match command {
        Command::GetClients => {
            let clients = state.read().await.client_ids();
            debug!(count = clients.len(), "Listing clients");
            Ok(DispatchResponse::Clients(clients))
        }
        Command::Heartbeat { client_id } => {
            state.write().await.touch(&client_id);
            debug!(client_id = %client_id, "Received heartbeat");
            Ok(DispatchResponse::Text(HEARTBEAT_ACK.to_string()))
        }
        Command::PollCommands { client_id } => {
            let commands = state.write().await.poll(&client_id);
            debug!(client_id = %client_id, count = commands.len(), "Sent commands to client");
            Ok(DispatchResponse::Commands(commands))
        }
        Command::GetClientState { client_id } => {
            let snapshot = state.read().await.client_snapshot(&client_id);
            snapshot
                .map(DispatchResponse::ClientState)
                .ok_or(AppError::ClientNotFound(client_id))
        }
        Command::SetClientState { client_id, pairs } => {
            let applied = state.write().await.apply_state(&client_id, pairs);
            debug!(client_id = %client_id, keys = applied.state.len(), "Set client state");
            Ok(DispatchResponse::ClientState(applied))
        }
        Command::ChangeTrack { client_id, track } => {
            queue(state, client_id, TRACK_KEY, CHANGE_TRACK, track).await
        }
        Command::ChangeVolume { client_id, volume } => {
            queue(state, client_id, VOLUME_KEY, CHANGE_VOLUME, volume).await
        }
    }
}

async fn queue(
    state: &SharedState,
    client_id: ClientId,
    state_key: &str,
    name: &str,
    value: String,
) -> Result<DispatchResponse, AppError> {
    let message = format!(
        "Command {} with value {} sent to client {}",
        name, value, client_id
    );
    state
        .write()
        .await
        .queue_command(&client_id, state_key, QueuedCommand::new(name, value));
    debug!(client_id = %client_id, command = name, "Queued command");
    Ok(DispatchResponse::Text(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    async fn run(state: &SharedState, line: &str) -> Result<DispatchResponse, AppError> {
        dispatch(state, Command::parse(line)?).await
    }

    #[tokio::test]
    async fn test_get_clients_empty() {
        let state = AppState::shared();
        let response = run(&state, "GET_CLIENTS").await.unwrap();
        assert_eq!(response, DispatchResponse::Clients(vec![]));
    }

    #[tokio::test]
    async fn test_heartbeat_registers_client() {
        let state = AppState::shared();
        let response = run(&state, "HEARTBEAT a1").await.unwrap();
        assert_eq!(response, DispatchResponse::Text(HEARTBEAT_ACK.to_string()));
        assert_eq!(
            run(&state, "GET_CLIENTS").await.unwrap(),
            DispatchResponse::Clients(vec!["a1".to_string()])
        );
    }

    #[tokio::test]
    async fn test_change_track_then_poll() {
        let state = AppState::shared();
        run(&state, "HEARTBEAT a1").await.unwrap();

        let response = run(&state, "CHANGE_TRACK a1 7").await.unwrap();
        assert_eq!(
            response,
            DispatchResponse::Text("Command CHANGE_TRACK with value 7 sent to client a1".to_string())
        );

        assert_eq!(
            run(&state, "POLL_COMMANDS a1").await.unwrap(),
            DispatchResponse::Commands(vec![QueuedCommand::new(CHANGE_TRACK, "7")])
        );

        match run(&state, "GET_CLIENT_STATE a1").await.unwrap() {
            DispatchResponse::ClientState(snapshot) => {
                assert_eq!(snapshot.client_id, "a1");
                assert_eq!(snapshot.state.get("Track").unwrap(), "7");
            }
            other => panic!("Expected ClientState, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_returns_commands_in_order_once() {
        let state = AppState::shared();
        for track in 1..=5 {
            run(&state, &format!("CHANGE_TRACK a1 {}", track))
                .await
                .unwrap();
        }

        let expected: Vec<QueuedCommand> = (1..=5)
            .map(|track| QueuedCommand::new(CHANGE_TRACK, track.to_string()))
            .collect();
        assert_eq!(
            run(&state, "POLL_COMMANDS a1").await.unwrap(),
            DispatchResponse::Commands(expected)
        );
        assert_eq!(
            run(&state, "POLL_COMMANDS a1").await.unwrap(),
            DispatchResponse::Commands(vec![])
        );
    }

    #[tokio::test]
    async fn test_get_client_state_unknown_is_not_found() {
        let state = AppState::shared();
        match run(&state, "GET_CLIENT_STATE ghost").await {
            Err(AppError::ClientNotFound(id)) => assert_eq!(id, "ghost"),
            other => panic!("Expected ClientNotFound, got: {:?}", other),
        }
        // Querying does not register the client
        assert!(!state.read().await.contains("ghost"));
    }

    #[tokio::test]
    async fn test_set_then_get_client_state() {
        let state = AppState::shared();
        let response = run(&state, "SET_CLIENT_STATE a1 mode shuffle Track 2")
            .await
            .unwrap();
        match response {
            DispatchResponse::ClientState(applied) => {
                assert_eq!(applied.state.len(), 2);
                assert_eq!(applied.state.get("mode").unwrap(), "shuffle");
            }
            other => panic!("Expected ClientState, got: {:?}", other),
        }

        run(&state, "SET_CLIENT_STATE a1 Track 9").await.unwrap();

        match run(&state, "GET_CLIENT_STATE a1").await.unwrap() {
            DispatchResponse::ClientState(snapshot) => {
                assert_eq!(snapshot.state.get("mode").unwrap(), "shuffle");
                assert_eq!(snapshot.state.get("Track").unwrap(), "9");
            }
            other => panic!("Expected ClientState, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_last_heartbeat_non_decreasing() {
        let state = AppState::shared();
        run(&state, "HEARTBEAT a1").await.unwrap();
        let first = match run(&state, "GET_CLIENT_STATE a1").await.unwrap() {
            DispatchResponse::ClientState(snapshot) => snapshot.last_heartbeat,
            other => panic!("Expected ClientState, got: {:?}", other),
        };

        run(&state, "HEARTBEAT a1").await.unwrap();
        let second = match run(&state, "GET_CLIENT_STATE a1").await.unwrap() {
            DispatchResponse::ClientState(snapshot) => snapshot.last_heartbeat,
            other => panic!("Expected ClientState, got: {:?}", other),
        };

        assert!(second >= first);
    }

    #[tokio::test]
    async fn test_unknown_command_does_not_register() {
        let state = AppState::shared();
        assert!(matches!(
            run(&state, "PLAY a1 3").await,
            Err(AppError::UnknownCommand(_))
        ));
        assert!(state.read().await.client_ids().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_volume_changes_stay_isolated() {
        let state = AppState::shared();
        let mut handles = Vec::new();
        for client in 0..8 {
            for volume in 0..25 {
                let state = state.clone();
                handles.push(tokio::spawn(async move {
                    let line = format!("CHANGE_VOLUME client-{} {}-{}", client, client, volume);
                    run(&state, &line).await.unwrap();
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for client in 0..8 {
            let id = format!("client-{}", client);
            let commands = match run(&state, &format!("POLL_COMMANDS {}", id)).await.unwrap() {
                DispatchResponse::Commands(commands) => commands,
                other => panic!("Expected Commands, got: {:?}", other),
            };
            assert_eq!(commands.len(), 25);
            let prefix = format!("{}-", client);
            assert!(commands
                .iter()
                .all(|c| c.name == CHANGE_VOLUME && c.argument.starts_with(&prefix)));
        }
    }
}
