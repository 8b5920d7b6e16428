//! Playback agent
//!
//! Registers with the control server under a random identity, heartbeats
//! every 10 seconds and polls for queued commands every 5 seconds until
//! interrupted.

use playback_control::api::command::{CHANGE_TRACK, CHANGE_VOLUME};
use playback_control::client::ControlClient;
use playback_control::config::ClientConfig;
use playback_control::state::QueuedCommand;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const HEARTBEAT_EVERY: Duration = Duration::from_secs(10);
const POLL_EVERY: Duration = Duration::from_secs(5);

fn apply_command(client_id: &str, command: &QueuedCommand) {
    match command.name.as_str() {
        CHANGE_TRACK => info!(client_id, track = %command.argument, "Changing track"),
        CHANGE_VOLUME => info!(client_id, volume = %command.argument, "Changing volume"),
        other => warn!(client_id, command = other, "Ignoring unsupported command"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ClientConfig::load()?;
    let client = ControlClient::from_config(&config)?;
    let client_id = Uuid::new_v4().to_string();
    info!(client_id = %client_id, server = %config.base_url(), "Agent starting");

    let mut heartbeat = tokio::time::interval(HEARTBEAT_EVERY);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poll = tokio::time::interval(POLL_EVERY);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if let Err(e) = client.heartbeat(&client_id).await {
                    error!(error = %e, "Heartbeat failed");
                }
            }
            _ = poll.tick() => {
                match client.poll_commands(&client_id).await {
                    Ok(commands) => {
                        for command in &commands {
                            apply_command(&client_id, command);
                        }
                    }
                    Err(e) => error!(error = %e, "Polling for commands failed"),
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    info!(client_id = %client_id, "Agent stopped");
    Ok(())
}
