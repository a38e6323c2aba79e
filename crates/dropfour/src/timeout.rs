//! Turn-timeout sweeper.
//!
//! Runs on a fixed cadence independent of message arrival. Each sweep
//! serializes with in-flight moves on the engine lock, so a move that
//! lands first refreshes the clock and wins the race.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::server::ServerState;

pub(crate) fn spawn_sweeper(state: Arc<ServerState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.sweep_interval);
        loop {
            interval.tick().await;
            state.engine.lock().await.sweep_timeouts(Instant::now());
        }
    })
}
