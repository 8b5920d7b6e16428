//! Liveness monitor
//!
//! Background task that sweeps the client registry once per heartbeat
//! interval. A client whose last request is older than the interval at sweep
//! time accumulates a miss; a fresh request resets the count. Once the count
//! exceeds the configured maximum the client is evicted from the registry, its
//! command queue and its state in a single write.
//!
//! Miss counters are owned by the monitor and created on demand, so clients
//! that register after the monitor started are tracked like any other.

use crate::config::LivenessConfig;
use crate::state::{AppState, ClientId, SharedState};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Liveness of a registered client as seen by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Heard from within the last interval
    Alive,
    /// Missed this many consecutive sweeps, not yet evicted
    Suspect(u32),
}

/// Outcome of one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Clients that missed this sweep, with their miss count
    pub suspect: Vec<(ClientId, u32)>,
    /// Clients evicted by this sweep
    pub evicted: Vec<ClientId>,
}

/// Detects and evicts clients that stopped heartbeating
#[derive(Debug)]
pub struct LivenessMonitor {
    interval: Duration,
    max_missed: u32,
    missed: HashMap<ClientId, u32>,
}

impl LivenessMonitor {
    /// Create a monitor sweeping every `interval`
    pub fn new(interval: Duration, max_missed: u32) -> Self {
        Self {
            interval,
            max_missed,
            missed: HashMap::new(),
        }
    }

    /// Create a monitor from the loaded configuration
    pub fn from_config(config: &LivenessConfig) -> Self {
        Self::new(config.heartbeat_interval(), config.max_missed_heartbeats)
    }

    /// Current liveness of a client
    ///
    /// Clients the monitor has not swept yet are reported alive.
    pub fn liveness(&self, id: &str) -> Liveness {
        match self.missed.get(id).copied().unwrap_or(0) {
            0 => Liveness::Alive,
            count => Liveness::Suspect(count),
        }
    }

    /// Number of miss counters held
    pub fn tracked(&self) -> usize {
        self.missed.len()
    }

    /// Evaluate every registered client against `now`
    pub fn sweep(&mut self, state: &mut AppState, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();

        for id in state.client_ids() {
            let Some(heartbeat) = state.registry().last_seen(&id) else {
                continue;
            };
            let elapsed = now.saturating_duration_since(heartbeat.at);
            let counter = self.missed.entry(id.clone()).or_insert(0);

            if elapsed <= self.interval {
                if *counter > 0 {
                    debug!(client_id = %id, "Client recovered");
                }
                *counter = 0;
                continue;
            }

            *counter += 1;
            let count = *counter;
            if count > self.max_missed {
                self.missed.remove(&id);
                state.evict(&id);
                warn!(
                    client_id = %id,
                    missed = count,
                    idle_secs = elapsed.as_secs(),
                    "Client disconnected due to missed heartbeats"
                );
                report.evicted.push(id);
            } else {
                debug!(client_id = %id, missed = count, "Client missed heartbeat");
                report.suspect.push((id, count));
            }
        }

        // Forget counters of clients that left the registry some other way
        self.missed.retain(|id, _| state.contains(id));
        report
    }

    /// Sweep every interval until `shutdown` flips to true or its sender is
    /// dropped
    pub async fn run(mut self, state: SharedState, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            max_missed = self.max_missed,
            "Liveness monitor started"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut guard = state.write().await;
                    let report = self.sweep(&mut guard, Instant::now());
                    let remaining = guard.client_count();
                    drop(guard);

                    if !report.evicted.is_empty() {
                        info!(
                            evicted = report.evicted.len(),
                            remaining,
                            "Liveness sweep evicted clients"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Liveness monitor stopped");
    }

    /// Spawn the monitor as a background task
    pub fn spawn(self, state: SharedState, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(state, shutdown))
    }
}
