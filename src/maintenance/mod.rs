use chrono::Utc;
use tokio::time::{Duration as TokioDuration, sleep};
use tracing::{debug, info};

use crate::web::AppState;

const SWEEP_INTERVAL_MINUTES: u64 = 5;

pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let interval = TokioDuration::from_secs(SWEEP_INTERVAL_MINUTES * 60);
        loop {
            sleep(interval).await;
            run_sweep(&state).await;
        }
    });
}

async fn run_sweep(state: &AppState) -> usize {
    let cutoff = Utc::now() - state.config().session_idle;
    let removed = state.sessions().purge_idle(cutoff).await;

    let remaining = state.sessions().len().await;
    if removed > 0 {
        info!(removed, remaining, "dropped idle uploader sessions");
    } else {
        debug!(remaining, "no idle uploader sessions");
    }

    removed
}
