//! Periodic expiry of write jobs.
//!
//! Completed jobs are dropped once their grace period has passed; any job
//! is dropped at the configured maximum age.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::jobs::JobRegistry;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(jobs: Arc<JobRegistry>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Job sweep started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = jobs.sweep().await;
                if removed > 0 {
                    tracing::info!(removed, "Job sweep: expired jobs removed");
                } else {
                    tracing::debug!("Job sweep: nothing to remove");
                }
            }
        }
    }
}
