//! Write Job Registry.
//!
//! Owns every live write job. Each job pairs its coordination record
//! (behind an async mutex, held only for short bookkeeping steps) with a
//! [`ProgressBus`] that can be subscribed to without touching that lock,
//! so late subscribers get the latest snapshot even mid-write.

use std::collections::HashMap;
use std::sync::Arc;

use hydrolink_core::progress::ProgressEvent;
use hydrolink_core::submission::CreateJobRequest;
use hydrolink_core::types::{new_job_id, JobId};
use hydrolink_events::{ProgressBus, Subscription};
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::config::JobConfig;
use crate::jobs::clock::Clock;
use crate::jobs::job::WriteJob;

/// Shared handle to one registered job.
pub struct JobHandle {
    pub id: JobId,
    pub bus: ProgressBus<ProgressEvent>,
    pub job: Mutex<WriteJob>,
}

impl JobHandle {
    /// Store `event` as the latest snapshot and forward it to subscribers.
    pub fn publish(&self, event: ProgressEvent) {
        let delivered = self.bus.publish(event);
        tracing::trace!(job_id = %self.id, delivered, "Progress published");
    }

    pub fn subscribe(&self) -> (Subscription<ProgressEvent>, mpsc::UnboundedReceiver<ProgressEvent>) {
        self.bus.subscribe()
    }
}

/// In-memory registry of write jobs with an injected clock.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobHandle>>>,
    clock: Arc<dyn Clock>,
    policy: JobConfig,
}

impl JobRegistry {
    pub fn new(clock: Arc<dyn Clock>, policy: JobConfig) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            clock,
            policy,
        }
    }

    /// Register a new job and return its handle.
    pub async fn create(&self, seed: &CreateJobRequest) -> Arc<JobHandle> {
        let id = new_job_id();
        let handle = Arc::new(JobHandle {
            id: id.clone(),
            bus: ProgressBus::new(),
            job: Mutex::new(WriteJob::new(id.clone(), self.clock.now(), seed)),
        });
        self.jobs.write().await.insert(id.clone(), Arc::clone(&handle));
        tracing::info!(
            job_id = %id,
            expected_total = ?seed.expected_total,
            expected_submissions = ?seed.expected_submissions,
            "Write job created",
        );
        handle
    }

    pub async fn get(&self, id: &str) -> Option<Arc<JobHandle>> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Publish the terminal event, mark the job completed, and close its
    /// subscriber list.
    pub async fn finish(&self, handle: &JobHandle, event: ProgressEvent) {
        let succeeded = event.error().is_none();
        {
            let mut job = handle.job.lock().await;
            job.complete(succeeded, self.clock.now());
        }
        handle.bus.finish(event);
        tracing::info!(job_id = %handle.id, succeeded, "Write job finished");
    }

    /// Drop expired jobs, closing their streams. Returns how many went.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let snapshot: Vec<Arc<JobHandle>> = self.jobs.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for handle in snapshot {
            let job = handle.job.lock().await;
            if job.is_expired(now, &self.policy) {
                tracing::debug!(job_id = %handle.id, state = job.state.as_str(), "Write job expired");
                drop(job);
                expired.push(handle);
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut jobs = self.jobs.write().await;
        for handle in &expired {
            jobs.remove(&handle.id);
            handle.bus.close();
        }
        expired.len()
    }

    /// Close every job's stream (shutdown).
    pub async fn close_all(&self) {
        let jobs = self.jobs.read().await;
        for handle in jobs.values() {
            handle.bus.close();
        }
        tracing::info!(count = jobs.len(), "Closed all write job streams");
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use hydrolink_core::progress::WriteStatus;

    use super::*;
    use crate::jobs::clock::FakeClock;

    fn registry() -> (Arc<FakeClock>, JobRegistry) {
        let clock = Arc::new(FakeClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
        let registry = JobRegistry::new(clock.clone(), JobConfig::default());
        (clock, registry)
    }

    #[tokio::test]
    async fn late_subscriber_gets_latest_snapshot() {
        let (_clock, registry) = registry();
        let handle = registry.create(&CreateJobRequest::default()).await;

        handle.publish(ProgressEvent::write(WriteStatus::Starting, 0, 2, ""));
        handle.publish(ProgressEvent::write(WriteStatus::Writing, 1, 2, ""));

        let (_sub, mut rx) = registry.get(&handle.id).await.unwrap().subscribe();
        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::write(WriteStatus::Writing, 1, 2, ""))
        );
    }

    #[tokio::test]
    async fn finish_completes_job_and_ends_streams() {
        let (_clock, registry) = registry();
        let handle = registry.create(&CreateJobRequest::default()).await;
        let (_sub, mut rx) = handle.subscribe();

        registry
            .finish(&handle, ProgressEvent::write(WriteStatus::Done, 0, 0, ""))
            .await;

        assert!(rx.recv().await.is_some());
        assert_eq!(rx.recv().await, None);
        assert!(handle.job.lock().await.state.is_completed());
    }

    #[tokio::test]
    async fn sweep_keeps_completed_job_through_grace_period() {
        let (clock, registry) = registry();
        let handle = registry.create(&CreateJobRequest::default()).await;
        registry
            .finish(&handle, ProgressEvent::write(WriteStatus::Done, 0, 0, ""))
            .await;

        clock.advance(Duration::from_secs(9));
        assert_eq!(registry.sweep().await, 0);
        assert!(registry.get(&handle.id).await.is_some());

        clock.advance(Duration::from_secs(1));
        assert_eq!(registry.sweep().await, 1);
        assert!(registry.get(&handle.id).await.is_none());
    }

    #[tokio::test]
    async fn sweep_removes_abandoned_job_at_max_age() {
        let (clock, registry) = registry();
        let handle = registry.create(&CreateJobRequest::default()).await;
        let (_sub, mut rx) = handle.subscribe();

        clock.advance(Duration::from_secs(29 * 60 + 59));
        assert_eq!(registry.sweep().await, 0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(registry.sweep().await, 1);
        assert!(registry.is_empty().await);
        assert_eq!(rx.recv().await, None);
    }
}
