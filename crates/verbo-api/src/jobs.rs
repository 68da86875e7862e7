//! Background jobs for periodic maintenance tasks.

use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::time::interval;
use verbo_db::PgRecordStore;

/// First run waits this long to stay out of the way of startup traffic.
const PRUNE_STARTUP_DELAY: Duration = Duration::from_secs(600);
const PRUNE_PERIOD: Duration = Duration::from_secs(86400);

/// Start all background jobs
///
/// Returns the join handles so the caller can abort them on shutdown
pub fn start_background_jobs(
    store: PgRecordStore,
    attempt_log_retention_days: u32,
) -> Vec<tokio::task::JoinHandle<()>> {
    vec![tokio::spawn(periodic_attempt_log_prune_job(
        store,
        attempt_log_retention_days,
    ))]
}

/// Delete attempt log entries past the retention window once a day
///
/// The difficulty adviser only reads the most recent attempts, so old entries
/// are dead weight. Review records are never pruned.
async fn periodic_attempt_log_prune_job(store: PgRecordStore, retention_days: u32) {
    tokio::time::sleep(PRUNE_STARTUP_DELAY).await;

    let mut interval = interval(PRUNE_PERIOD);

    loop {
        interval.tick().await;

        let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
        match store.prune_attempts(cutoff).await {
            Ok(deleted) if deleted > 0 => {
                tracing::info!(deleted, %cutoff, "Pruned attempt log");
            }
            Ok(_) => {
                tracing::debug!(%cutoff, "Attempt log prune: nothing to delete");
            }
            Err(e) => {
                crate::metrics::record_store_error("backend");
                tracing::error!(error = %e, "Failed to prune attempt log");
            }
        }
    }
}
