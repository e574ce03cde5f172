use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::AppState;

/// What one sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub consumed_nonces: usize,
    pub idle_guests: usize,
}

/// Background task that prunes expired reset nonces and idle quota entries.
///
/// Runs on an interval for the life of the process.
pub async fn run_cleanup_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        let sweep_state = state.clone();
        let result =
            tokio::task::spawn_blocking(move || sweep_at(&sweep_state, Utc::now())).await;

        match result {
            Ok(Ok(report)) => {
                if report != CleanupReport::default() {
                    info!(
                        "Cleanup: pruned {} consumed reset nonces, {} idle guest identities",
                        report.consumed_nonces, report.idle_guests
                    );
                }
            }
            Ok(Err(e)) => warn!("Cleanup error: {:#}", e),
            Err(e) => warn!("Cleanup task failed: {}", e),
        }
    }
}

/// Blocking. One pruning pass as of `now`.
pub fn sweep_at(state: &AppState, now: DateTime<Utc>) -> anyhow::Result<CleanupReport> {
    let idle_guests = state.guest_quota.prune_idle_at(now)
        + state.signup_limiter.prune_idle_at(now)
        + state.login_limiter.prune_idle_at(now);
    let consumed_nonces = state.db.prune_consumed_nonces(now.timestamp())?;

    Ok(CleanupReport {
        consumed_nonces,
        idle_guests,
    })
}
