use hydrolink_core::error::CoreError;
use hydrolink_core::interval::expected_requests;
use hydrolink_core::submission::{CreateJobRequest, SubmissionGroup};
use hydrolink_core::types::{JobId, Timestamp};

use crate::config::JobConfig;
use crate::jobs::state::{ready_to_write, JobState};

/// Outcome of buffering one submission.
#[derive(Debug, PartialEq)]
pub enum Accepted {
    /// Still waiting for more submissions. `meta_only` when this one
    /// carried no writable series.
    Buffering { meta_only: bool },
    /// The buffer is complete: write these groups, in order.
    Ready(Vec<SubmissionGroup>),
}

/// Mutable coordination record of one write job.
#[derive(Debug)]
pub struct WriteJob {
    pub id: JobId,
    pub state: JobState,
    pending: Vec<SubmissionGroup>,
    /// Overrides the interval heuristic when set.
    expected_submissions: Option<usize>,
    seeded_total: usize,
    pub expected_total: usize,
    pub completed_count: usize,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl WriteJob {
    pub fn new(id: JobId, created_at: Timestamp, seed: &CreateJobRequest) -> Self {
        let seeded_total = seed.expected_total.unwrap_or(0);
        let expected_submissions = seed.expected_submissions.filter(|n| *n > 0);
        Self {
            id,
            state: JobState::Buffering {
                received: 0,
                expected: expected_submissions.unwrap_or(0),
            },
            pending: Vec::new(),
            expected_submissions,
            seeded_total,
            expected_total: seeded_total,
            completed_count: 0,
            created_at,
            completed_at: None,
        }
    }

    /// Buffer one submission and decide whether the write can start.
    ///
    /// Ineligible series are dropped first. A group left empty counts as a
    /// received submission only when the job was seeded with a submission
    /// count; otherwise it is acknowledged and ignored, so it can never
    /// complete a buffer. On [`Accepted::Ready`] the job
    /// moves to [`JobState::Writing`] and `expected_total` is pinned to
    /// the number of series handed out.
    pub fn accept(&mut self, group: SubmissionGroup) -> Result<Accepted, CoreError> {
        let received = match self.state {
            JobState::Buffering { received, .. } => received + 1,
            JobState::Writing => {
                return Err(CoreError::Conflict(format!(
                    "Write job {} is already writing",
                    self.id
                )))
            }
            JobState::Done | JobState::Failed => {
                return Err(CoreError::Conflict(format!(
                    "Write job {} is already completed",
                    self.id
                )))
            }
        };

        let group = group.retain_eligible();
        let meta_only = group.is_meta_only();
        if meta_only && self.expected_submissions.is_none() {
            return Ok(Accepted::Buffering { meta_only: true });
        }

        let expected = self
            .expected_submissions
            .unwrap_or_else(|| expected_requests(&group.interval));

        if !meta_only {
            self.pending.push(group);
        }
        let buffered = self.buffered_series();

        if ready_to_write(received, expected) {
            self.state = JobState::Writing;
            self.expected_total = buffered;
            return Ok(Accepted::Ready(std::mem::take(&mut self.pending)));
        }

        self.state = JobState::Buffering { received, expected };
        self.expected_total = self.seeded_total.max(buffered);
        Ok(Accepted::Buffering { meta_only })
    }

    pub fn buffered_series(&self) -> usize {
        self.pending.iter().map(|g| g.series.len()).sum()
    }

    /// Count one written series; never passes `expected_total`.
    pub fn record_written(&mut self) -> usize {
        self.completed_count = (self.completed_count + 1).min(self.expected_total);
        self.completed_count
    }

    /// Enter the terminal state.
    pub fn complete(&mut self, succeeded: bool, at: Timestamp) {
        self.state = if succeeded {
            JobState::Done
        } else {
            JobState::Failed
        };
        self.pending.clear();
        self.completed_at = Some(at);
    }

    /// Whether the sweep should drop this job at `now`.
    ///
    /// Completed jobs go once the grace period since completion has passed;
    /// every job goes once it reaches the maximum age.
    pub fn is_expired(&self, now: Timestamp, policy: &JobConfig) -> bool {
        let elapsed = |since: Timestamp| (now - since).to_std().unwrap_or_default();

        if elapsed(self.created_at) >= policy.max_age {
            return true;
        }
        self.completed_at
            .is_some_and(|at| elapsed(at) >= policy.completed_grace)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use hydrolink_core::submission::SeriesPayload;

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn series(values: usize) -> SeriesPayload {
        SeriesPayload {
            station_id: "01646500".into(),
            pathname: "/01646500//FLOW/01JAN2000/1Day/USGS/".into(),
            start_date_time: "2000-01-01T00:00:00Z".into(),
            values: vec![1.0; values],
            times: vec![36525.0; values],
            units: "CFS".into(),
            value_type: "PER-AVER".into(),
        }
    }

    fn group(interval: &str, series_values: &[usize]) -> SubmissionGroup {
        SubmissionGroup {
            series: series_values.iter().map(|n| series(*n)).collect(),
            interval: interval.into(),
            filepath: "discharge.dss".into(),
        }
    }

    fn job(seed: CreateJobRequest) -> WriteJob {
        WriteJob::new("job-1".into(), t0(), &seed)
    }

    #[test]
    fn daily_interval_waits_for_second_submission() {
        let mut job = job(CreateJobRequest::default());

        let first = job.accept(group("1Day", &[3])).unwrap();
        assert_eq!(first, Accepted::Buffering { meta_only: false });
        assert_eq!(job.state, JobState::Buffering { received: 1, expected: 2 });
        assert_eq!(job.expected_total, 1);

        let second = job.accept(group("1Day", &[2])).unwrap();
        assert_matches!(second, Accepted::Ready(groups) if groups.len() == 2);
        assert_eq!(job.state, JobState::Writing);
        assert_eq!(job.expected_total, 2);
    }

    #[test]
    fn irregular_interval_is_ready_immediately() {
        let mut job = job(CreateJobRequest::default());

        let accepted = job.accept(group("IR-Century", &[1, 1, 1])).unwrap();

        assert_matches!(accepted, Accepted::Ready(groups) if groups[0].series.len() == 3);
        assert_eq!(job.expected_total, 3);
    }

    #[test]
    fn seeded_submission_count_overrides_heuristic() {
        let mut job = job(CreateJobRequest {
            expected_total: None,
            expected_submissions: Some(3),
        });

        assert_matches!(job.accept(group("IR-Century", &[1])), Ok(Accepted::Buffering { .. }));
        assert_matches!(job.accept(group("IR-Century", &[])), Ok(Accepted::Buffering { meta_only: true }));
        assert_matches!(job.accept(group("IR-Century", &[1])), Ok(Accepted::Ready(groups)) if groups.len() == 2);
    }

    #[test]
    fn meta_only_submission_does_not_complete_unseeded_buffer() {
        let mut job = job(CreateJobRequest::default());

        job.accept(group("1Day", &[2])).unwrap();
        let empty = job.accept(group("1Day", &[0])).unwrap();

        assert_eq!(empty, Accepted::Buffering { meta_only: true });
        assert_eq!(job.state, JobState::Buffering { received: 1, expected: 2 });
        assert_matches!(job.accept(group("1Day", &[1])), Ok(Accepted::Ready(groups)) if groups.len() == 2);
    }

    #[test]
    fn ineligible_series_are_dropped() {
        let mut job = job(CreateJobRequest::default());

        let accepted = job.accept(group("IR-Century", &[0, 2])).unwrap();

        assert_matches!(accepted, Accepted::Ready(groups) if groups[0].series.len() == 1);
    }

    #[test]
    fn expected_total_never_drops_below_seed_while_buffering() {
        let mut job = job(CreateJobRequest {
            expected_total: Some(10),
            expected_submissions: None,
        });

        job.accept(group("1Day", &[1])).unwrap();
        assert_eq!(job.expected_total, 10);
    }

    #[test]
    fn submissions_after_writing_starts_conflict() {
        let mut job = job(CreateJobRequest::default());
        job.accept(group("IR-Century", &[1])).unwrap();

        assert_matches!(job.accept(group("IR-Century", &[1])), Err(CoreError::Conflict(_)));

        job.complete(true, t0());
        assert_matches!(job.accept(group("IR-Century", &[1])), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn completed_count_is_capped() {
        let mut job = job(CreateJobRequest::default());
        job.accept(group("IR-Century", &[1])).unwrap();

        assert_eq!(job.record_written(), 1);
        assert_eq!(job.record_written(), 1);
    }

    #[test]
    fn expiry_uses_completion_grace_and_max_age() {
        let policy = JobConfig::default();
        let mut job = job(CreateJobRequest::default());

        assert!(!job.is_expired(t0() + chrono::Duration::minutes(29), &policy));
        assert!(job.is_expired(t0() + chrono::Duration::minutes(30), &policy));

        let done_at = t0() + chrono::Duration::minutes(5);
        job.complete(true, done_at);
        assert!(!job.is_expired(done_at + chrono::Duration::seconds(9), &policy));
        assert!(job.is_expired(done_at + chrono::Duration::seconds(10), &policy));
    }
}
