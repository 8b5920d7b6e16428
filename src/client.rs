//! Control server client
//!
//! HTTP client used by playback agents (heartbeat, poll) and by operator
//! tooling (list clients, queue track/volume changes, read/set state).
//! Every call POSTs one command line to the server root with HTTP Basic auth.
//!
//! Connection failures and timeouts are retried indefinitely: every 5 seconds
//! at first, then every 20 seconds once a minute has passed without success.
//! Any HTTP response, including an error status, ends the retry loop.

use crate::api::command::{
    CHANGE_TRACK, CHANGE_VOLUME, GET_CLIENTS, GET_CLIENT_STATE, HEARTBEAT, POLL_COMMANDS,
    SET_CLIENT_STATE,
};
use crate::config::ClientConfig;
use crate::state::{ClientId, ClientSnapshot, QueuedCommand};
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Timeout for a single request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors returned by `ControlClient`
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request could not be built or sent
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The response body was not the expected JSON
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Delays between attempts while the server is unreachable
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay used during the first `escalate_after`
    pub initial_delay: Duration,
    /// Delay used afterwards
    pub max_delay: Duration,
    /// How long to keep retrying at `initial_delay`
    pub escalate_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(20),
            escalate_after: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, given the time since the first one
    pub fn delay_after(&self, elapsed: Duration) -> Duration {
        if elapsed > self.escalate_after {
            self.max_delay
        } else {
            self.initial_delay
        }
    }
}

/// Client for the control server's command endpoint
#[derive(Clone)]
pub struct ControlClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    retry: RetryPolicy,
}

impl ControlClient {
    /// Build a client for `base_url` (e.g. `http://localhost:8000`)
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: format!("{}/", base_url.trim_end_matches('/')),
            username: username.into(),
            password: password.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Build a client from agent settings
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(
            config.base_url(),
            config.username.clone(),
            config.password.clone(),
        )
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send a raw command line and return the response body
    pub async fn send_command(&self, command: &str) -> Result<String, ClientError> {
        let started = Instant::now();
        loop {
            let request = self
                .client
                .post(&self.base_url)
                .basic_auth(&self.username, Some(&self.password))
                .header(CONTENT_TYPE, "text/plain")
                .body(command.to_string());

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await?;
                    if !status.is_success() {
                        return Err(ClientError::Status {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    debug!(command = %command, response = %body, "Received response");
                    return Ok(body);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    let delay = self.retry.delay_after(started.elapsed());
                    warn!(
                        error = %e,
                        retry_in_ms = delay.as_millis(),
                        "Control server unreachable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Report liveness for `client_id`
    pub async fn heartbeat(&self, client_id: &str) -> Result<(), ClientError> {
        self.send_command(&format!("{} {}", HEARTBEAT, client_id))
            .await
            .map(|_| ())
    }

    /// Fetch and clear the commands queued for `client_id`
    pub async fn poll_commands(&self, client_id: &str) -> Result<Vec<QueuedCommand>, ClientError> {
        let body = self
            .send_command(&format!("{} {}", POLL_COMMANDS, client_id))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// List registered clients
    pub async fn get_clients(&self) -> Result<Vec<ClientId>, ClientError> {
        let body = self.send_command(GET_CLIENTS).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Queue a track change; returns the server's confirmation
    pub async fn change_track(&self, client_id: &str, track: &str) -> Result<String, ClientError> {
        self.send_command(&format!("{} {} {}", CHANGE_TRACK, client_id, track))
            .await
    }

    /// Queue a volume change; returns the server's confirmation
    pub async fn change_volume(&self, client_id: &str, volume: &str) -> Result<String, ClientError> {
        self.send_command(&format!("{} {} {}", CHANGE_VOLUME, client_id, volume))
            .await
    }

    /// Read a client's recorded state
    pub async fn get_client_state(&self, client_id: &str) -> Result<ClientSnapshot, ClientError> {
        let body = self
            .send_command(&format!("{} {}", GET_CLIENT_STATE, client_id))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Merge key/value pairs into a client's state; returns the applied pairs
    pub async fn set_client_state(
        &self,
        client_id: &str,
        pairs: &[(&str, &str)],
    ) -> Result<ClientSnapshot, ClientError> {
        let mut line = format!("{} {}", SET_CLIENT_STATE, client_id);
        for (key, value) in pairs {
            line.push(' ');
            line.push_str(key);
            line.push(' ');
            line.push_str(value);
        }
        let body = self.send_command(&line).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
