//! Application configuration
//!
//! Centralized configuration management with environment variable support,
//! an optional JSON config file and sensible defaults.
//!
//! Server settings:
//! - `CONFIG_FILE`: optional path to a JSON file with any of `host`, `port`,
//!   `username`, `password`, `heartbeat_interval_secs`, `max_missed_heartbeats`
//! - `HOST`, `PORT`, `AUTH_USERNAME`, `AUTH_PASSWORD`,
//!   `HEARTBEAT_INTERVAL_SECS`, `MAX_MISSED_HEARTBEATS`: override the file
//!
//! Agent settings:
//! - `CLIENT_CONFIG_FILE`: optional path to a JSON file with `hostname`,
//!   `port`, `username` and `password`
//! - `CONTROL_HOST`, `CONTROL_PORT`, `CONTROL_USERNAME`, `CONTROL_PASSWORD`

use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "password";
const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 10;
const DEFAULT_MAX_MISSED_HEARTBEATS: u32 = 5;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path of the config file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected shape
    #[error("Invalid config file {path}: {source}")]
    Json {
        /// Path of the config file
        path: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// A value is present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Shared credential pair
    pub auth: AuthConfig,
    /// Liveness sweep configuration
    pub liveness: LivenessConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Credentials every request must present
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected username
    pub username: String,
    /// Expected password
    pub password: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Liveness configuration
#[derive(Debug, Clone)]
pub struct LivenessConfig {
    /// Expected heartbeat period, also the sweep period (in seconds)
    pub heartbeat_interval_secs: u64,
    /// Number of consecutive missed sweeps tolerated before eviction
    pub max_missed_heartbeats: u32,
}

impl LivenessConfig {
    /// Heartbeat interval as a `Duration`
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Shape of the optional server config file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    heartbeat_interval_secs: Option<u64>,
    max_missed_heartbeats: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::merge(FileConfig::default())
    }

    /// Load configuration from a JSON file, with environment variables
    /// taking precedence over the file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::merge(read_json(path.as_ref())?);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `CONFIG_FILE` if set, otherwise from the
    /// environment alone
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("CONFIG_FILE") {
            Ok(path) => Self::from_file(path),
            Err(_) => {
                let config = Self::from_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn merge(file: FileConfig) -> Self {
        Self {
            server: ServerConfig {
                port: env_parse("PORT").or(file.port).unwrap_or(DEFAULT_PORT),
                host: env::var("HOST")
                    .ok()
                    .or(file.host)
                    .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            },
            auth: AuthConfig {
                username: env::var("AUTH_USERNAME")
                    .ok()
                    .or(file.username)
                    .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
                password: env::var("AUTH_PASSWORD")
                    .ok()
                    .or(file.password)
                    .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            },
            liveness: LivenessConfig {
                heartbeat_interval_secs: env_parse("HEARTBEAT_INTERVAL_SECS")
                    .or(file.heartbeat_interval_secs)
                    .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_SECS),
                max_missed_heartbeats: env_parse("MAX_MISSED_HEARTBEATS")
                    .or(file.max_missed_heartbeats)
                    .unwrap_or(DEFAULT_MAX_MISSED_HEARTBEATS),
            },
        }
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.liveness.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat interval must be at least one second".to_string(),
            ));
        }
        if self.auth.username.is_empty() {
            return Err(ConfigError::Invalid("username cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Connection settings for a playback agent
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// Control server host name
    pub hostname: String,
    /// Control server port
    pub port: u16,
    /// Username for HTTP Basic auth
    pub username: String,
    /// Password for HTTP Basic auth
    pub password: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ClientConfig {
    /// Load agent settings from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            hostname: env::var("CONTROL_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env_parse("CONTROL_PORT").unwrap_or(DEFAULT_PORT),
            username: env::var("CONTROL_USERNAME").unwrap_or_else(|_| DEFAULT_USERNAME.to_string()),
            password: env::var("CONTROL_PASSWORD").unwrap_or_else(|_| DEFAULT_PASSWORD.to_string()),
        }
    }

    /// Load agent settings from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    /// Load agent settings from `CLIENT_CONFIG_FILE` if set, otherwise from
    /// the environment
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("CLIENT_CONFIG_FILE") {
            Ok(path) => Self::from_file(path),
            Err(_) => Ok(Self::from_env()),
        }
    }

    /// Base URL of the control server
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.hostname, self.port)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| ConfigError::Json {
        path: display,
        source,
    })
}
