//! Playback Control Server
//!
//! Central server for a fleet of playback agents. Agents heartbeat and poll
//! for commands; operators list agents, queue track/volume changes and read
//! or set per-agent state. A background sweep evicts agents that go silent.

use playback_control::auth::{BasicAuthenticator, SharedAuthenticator};
use playback_control::config::Config;
use playback_control::liveness::LivenessMonitor;
use playback_control::server::build_router;
use playback_control::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded: {:?}", config);

    // Initialize application state and the liveness sweep
    let app_state = AppState::shared();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = LivenessMonitor::from_config(&config.liveness).spawn(app_state.clone(), shutdown_rx);

    let authenticator: SharedAuthenticator = Arc::new(BasicAuthenticator::from_config(&config.auth));
    let app = build_router(app_state, authenticator);

    // Bind to address from config
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if shutdown_tx.send(true).is_err() {
        warn!("Liveness monitor already stopped");
    }
    if let Err(e) = monitor.await {
        warn!("Liveness monitor task failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
