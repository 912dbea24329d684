use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::scan::{ShotIndex, find_shots};
use crate::state::AppState;

/// Rescans the data directory forever, starting one period after launch.
pub async fn run(state: AppState, period: Duration) {
    info!(
        data_dir = %state.data_dir.display(),
        period_secs = period.as_secs(),
        "shot scanner started"
    );

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Consume the immediate first tick; startup already ran a scan.
    interval.tick().await;

    loop {
        interval.tick().await;
        scan_once(&state).await;
    }
}

/// Scan and swap in a fresh index. A failed scan leaves the current index untouched.
pub async fn scan_once(state: &AppState) {
    state.observability.record_scan();
    let data_dir = state.data_dir.clone();
    let shots = match tokio::task::spawn_blocking(move || find_shots(&data_dir)).await {
        Ok(Ok(shots)) => shots,
        Ok(Err(e)) => {
            state.observability.record_scan_failure();
            warn!(data_dir = %state.data_dir.display(), error = %e, "unable to scan for mapshots");
            return;
        }
        Err(e) => {
            state.observability.record_scan_failure();
            warn!(error = %e, "mapshot scan task failed");
            return;
        }
    };

    let mut index = state.index.write().await;
    let mut next = match ShotIndex::build(shots, index.generation) {
        Ok(next) => next,
        Err(e) => {
            state.observability.record_scan_failure();
            warn!(error = %e, "unable to serialize mapshot listing");
            return;
        }
    };
    // The generation only moves when the listing changes so ETags stay stable across rescans.
    if next.listing_json != index.listing_json {
        next.generation += 1;
    }

    if next.generation != index.generation {
        info!(
            shots = next.shots.len(),
            saves = next.save_count,
            generation = next.generation,
            "mapshot index updated"
        );
    }
    *index = next;
}
