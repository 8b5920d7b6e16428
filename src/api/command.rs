//! Command line parsing
//!
//! Requests carry a single whitespace-delimited line of the form
//! `<COMMAND> [<client_id>] [<args...>]`. Parsing checks the shape only;
//! nothing here touches application state.

use crate::error::AppError;
use crate::state::ClientId;

/// List registered clients
pub const GET_CLIENTS: &str = "GET_CLIENTS";
/// Agent liveness signal
pub const HEARTBEAT: &str = "HEARTBEAT";
/// Agent fetches its pending commands
pub const POLL_COMMANDS: &str = "POLL_COMMANDS";
/// Read a client's recorded state
pub const GET_CLIENT_STATE: &str = "GET_CLIENT_STATE";
/// Merge key/value pairs into a client's state
pub const SET_CLIENT_STATE: &str = "SET_CLIENT_STATE";
/// Queue a track change
pub const CHANGE_TRACK: &str = "CHANGE_TRACK";
/// Queue a volume change
pub const CHANGE_VOLUME: &str = "CHANGE_VOLUME";

/// A parsed, shape-checked command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `GET_CLIENTS`
    GetClients,
    /// `HEARTBEAT <client_id>`
    Heartbeat {
        /// Sending agent
        client_id: ClientId,
    },
    /// `POLL_COMMANDS <client_id>`
    PollCommands {
        /// Polling agent
        client_id: ClientId,
    },
    /// `GET_CLIENT_STATE <client_id>`
    GetClientState {
        /// Client to inspect
        client_id: ClientId,
    },
    /// `SET_CLIENT_STATE <client_id> [<key> <value>]...`
    SetClientState {
        /// Client to update
        client_id: ClientId,
        /// Pairs in the order they appeared
        pairs: Vec<(String, String)>,
    },
    /// `CHANGE_TRACK <client_id> <track>`
    ChangeTrack {
        /// Target agent
        client_id: ClientId,
        /// New track number
        track: String,
    },
    /// `CHANGE_VOLUME <client_id> <volume>`
    ChangeVolume {
        /// Target agent
        client_id: ClientId,
        /// New volume
        volume: String,
    },
}

impl Command {
    /// Parse a command line
    ///
    /// # Returns
    /// * `Err(AppError::MalformedRequest)` - too few tokens for the command
    /// * `Err(AppError::UnknownCommand)` - a command name and client ID, but
    ///   the name is not recognized
    pub fn parse(line: &str) -> Result<Self, AppError> {
        let mut tokens = line.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| AppError::MalformedRequest("empty command".to_string()))?;

        if name == GET_CLIENTS {
            return Ok(Self::GetClients);
        }

        let client_id = tokens
            .next()
            .ok_or_else(|| AppError::MalformedRequest(format!("{} requires a client id", name)))?
            .to_string();
        let args: Vec<&str> = tokens.collect();

        match name {
            HEARTBEAT => Ok(Self::Heartbeat { client_id }),
            POLL_COMMANDS => Ok(Self::PollCommands { client_id }),
            GET_CLIENT_STATE => Ok(Self::GetClientState { client_id }),
            SET_CLIENT_STATE => Ok(Self::SetClientState {
                client_id,
                pairs: parse_pairs(&args)?,
            }),
            CHANGE_TRACK => Ok(Self::ChangeTrack {
                client_id,
                track: required_argument(name, &args)?,
            }),
            CHANGE_VOLUME => Ok(Self::ChangeVolume {
                client_id,
                volume: required_argument(name, &args)?,
            }),
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }

    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetClients => GET_CLIENTS,
            Self::Heartbeat { .. } => HEARTBEAT,
            Self::PollCommands { .. } => POLL_COMMANDS,
            Self::GetClientState { .. } => GET_CLIENT_STATE,
            Self::SetClientState { .. } => SET_CLIENT_STATE,
            Self::ChangeTrack { .. } => CHANGE_TRACK,
            Self::ChangeVolume { .. } => CHANGE_VOLUME,
        }
    }

    /// Client the command refers to, if any
    pub fn client_id(&self) -> Option<&str> {
        match self {
            Self::GetClients => None,
            Self::Heartbeat { client_id }
            | Self::PollCommands { client_id }
            | Self::GetClientState { client_id }
            | Self::SetClientState { client_id, .. }
            | Self::ChangeTrack { client_id, .. }
            | Self::ChangeVolume { client_id, .. } => Some(client_id),
        }
    }
}

fn required_argument(name: &str, args: &[&str]) -> Result<String, AppError> {
    args.first()
        .map(|arg| arg.to_string())
        .ok_or_else(|| AppError::MalformedRequest(format!("{} requires a value", name)))
}

fn parse_pairs(args: &[&str]) -> Result<Vec<(String, String)>, AppError> {
    if let Some(dangling) = args.chunks_exact(2).remainder().first() {
        return Err(AppError::MalformedRequest(format!(
            "missing value for state key '{}'",
            dangling
        )));
    }

    Ok(args
        .chunks_exact(2)
        .filter_map(|pair| match pair {
            [key, value] => Some((key.to_string(), value.to_string())),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_clients() {
        assert_eq!(Command::parse("GET_CLIENTS").unwrap(), Command::GetClients);
        assert_eq!(Command::parse("  GET_CLIENTS \n").unwrap(), Command::GetClients);
    }

    #[test]
    fn test_parse_client_commands() {
        assert_eq!(
            Command::parse("HEARTBEAT a1").unwrap(),
            Command::Heartbeat {
                client_id: "a1".to_string()
            }
        );
        assert_eq!(
            Command::parse("POLL_COMMANDS a1").unwrap(),
            Command::PollCommands {
                client_id: "a1".to_string()
            }
        );
        assert_eq!(
            Command::parse("CHANGE_TRACK a1 7").unwrap(),
            Command::ChangeTrack {
                client_id: "a1".to_string(),
                track: "7".to_string()
            }
        );
        assert_eq!(
            Command::parse("CHANGE_VOLUME   a1\t42").unwrap(),
            Command::ChangeVolume {
                client_id: "a1".to_string(),
                volume: "42".to_string()
            }
        );
    }

    #[test]
    fn test_parse_set_client_state_pairs() {
        let command = Command::parse("SET_CLIENT_STATE a1 Track 3 mode shuffle").unwrap();
        assert_eq!(
            command,
            Command::SetClientState {
                client_id: "a1".to_string(),
                pairs: vec![
                    ("Track".to_string(), "3".to_string()),
                    ("mode".to_string(), "shuffle".to_string()),
                ],
            }
        );

        let empty = Command::parse("SET_CLIENT_STATE a1").unwrap();
        assert_eq!(
            empty,
            Command::SetClientState {
                client_id: "a1".to_string(),
                pairs: vec![],
            }
        );
    }

    #[test]
    fn test_malformed_requests() {
        for line in ["", "   ", "HEARTBEAT", "CHANGE_TRACK a1", "CHANGE_VOLUME a1", "PLAY"] {
            match Command::parse(line) {
                Err(AppError::MalformedRequest(_)) => {}
                other => panic!("Expected MalformedRequest for {:?}, got: {:?}", line, other),
            }
        }

        match Command::parse("SET_CLIENT_STATE a1 Track 3 mode") {
            Err(AppError::MalformedRequest(message)) => assert!(message.contains("mode")),
            other => panic!("Expected MalformedRequest, got: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command() {
        match Command::parse("PLAY a1 now") {
            Err(AppError::UnknownCommand(name)) => assert_eq!(name, "PLAY"),
            other => panic!("Expected UnknownCommand, got: {:?}", other),
        }
        // Command names are case-sensitive
        assert!(matches!(
            Command::parse("heartbeat a1"),
            Err(AppError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_name_and_client_id() {
        let command = Command::parse("CHANGE_TRACK a1 7").unwrap();
        assert_eq!(command.name(), CHANGE_TRACK);
        assert_eq!(command.client_id(), Some("a1"));
        assert_eq!(Command::GetClients.client_id(), None);
    }
}
