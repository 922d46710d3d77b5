//! Position ticker
//!
//! Cooperative polling loop that samples the engine's reported position and
//! publishes it into live state. Runs for the controller's entire lifetime so
//! sampling resumes immediately on play without a startup gap; an in-progress
//! user scrub suppresses publication so the ticker can never overwrite a
//! drag. Cancelled exactly once on dispose via the shutdown channel.

use crate::state::SessionState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use wavelet_engine::EngineAdapter;

/// Polling period for position sampling
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

pub(crate) async fn run(
    adapter: EngineAdapter,
    state: Arc<SessionState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = state.snapshot();
                if snapshot.is_playing && !snapshot.is_seeking {
                    let position_ms = adapter.position_ms();
                    state.update(|s| s.position_ms = position_ms);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
