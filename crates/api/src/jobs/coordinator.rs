//! Write Coordinator.
//!
//! Buffers submission groups per job until the job's expected submission
//! count is reached, then writes every buffered series sequentially, one
//! writer invocation per series, in submission order.

use std::path::Path;
use std::sync::Arc;

use hydrolink_core::error::CoreError;
use hydrolink_core::progress::{ProgressEvent, WriteStatus};
use hydrolink_core::submission::{SubmissionGroup, SubmitResponse, WriterInput};

use crate::error::{AppError, AppResult};
use crate::jobs::job::Accepted;
use crate::jobs::registry::{JobHandle, JobRegistry};
use crate::writer::{SeriesWriter, WriteError};

pub struct WriteCoordinator {
    jobs: Arc<JobRegistry>,
    writer: Arc<dyn SeriesWriter>,
}

impl WriteCoordinator {
    pub fn new(jobs: Arc<JobRegistry>, writer: Arc<dyn SeriesWriter>) -> Self {
        Self { jobs, writer }
    }

    /// Accept one group for `job_id`. `group.filepath` must already be
    /// the resolved output file.
    ///
    /// When the group completes the buffer the write runs before this
    /// returns. It runs on its own task, so a dropped request does not
    /// stop it.
    pub async fn submit(&self, job_id: &str, group: SubmissionGroup) -> AppResult<SubmitResponse> {
        let handle = self.jobs.get(job_id).await.ok_or_else(|| CoreError::NotFound {
            entity: "WriteJob",
            id: job_id.to_string(),
        })?;

        let accepted = handle.job.lock().await.accept(group)?;
        let groups = match accepted {
            Accepted::Buffering { meta_only: true } => {
                tracing::debug!(job_id, "Meta-only submission buffered");
                return Ok(SubmitResponse::meta_only());
            }
            Accepted::Buffering { meta_only: false } => {
                tracing::debug!(job_id, "Submission buffered");
                return Ok(SubmitResponse::buffered());
            }
            Accepted::Ready(groups) => groups,
        };

        let total: usize = groups.iter().map(|g| g.series.len()).sum();
        if total == 0 {
            self.jobs
                .finish(&handle, ProgressEvent::write(WriteStatus::Done, 0, 0, "Nothing to write"))
                .await;
            return Ok(SubmitResponse::meta_only());
        }

        tracing::info!(job_id, series = total, groups = groups.len(), "Starting write");
        let task = tokio::spawn(run_write(
            Arc::clone(&self.jobs),
            Arc::clone(&self.writer),
            handle,
            groups,
            total,
        ));

        match task.await {
            Ok(Ok(written)) => Ok(SubmitResponse::wrote(written)),
            Ok(Err(e)) => Err(AppError::Write(e)),
            Err(e) => Err(AppError::InternalError(format!("Write task failed: {e}"))),
        }
    }
}

async fn run_write(
    jobs: Arc<JobRegistry>,
    writer: Arc<dyn SeriesWriter>,
    handle: Arc<JobHandle>,
    groups: Vec<SubmissionGroup>,
    total: usize,
) -> Result<usize, WriteError> {
    handle.publish(ProgressEvent::write(
        WriteStatus::Starting,
        0,
        total,
        format!("Writing {total} series"),
    ));

    match write_groups(writer.as_ref(), &handle, &groups, total).await {
        Ok(()) => {
            jobs.finish(
                &handle,
                ProgressEvent::write(WriteStatus::Done, total, total, format!("Wrote {total} series")),
            )
            .await;
            tracing::info!(job_id = %handle.id, series = total, "Write completed");
            Ok(total)
        }
        Err(e) => {
            let done = handle.job.lock().await.completed_count;
            tracing::error!(job_id = %handle.id, done, total, error = %e, "Write failed");
            jobs.finish(&handle, ProgressEvent::write_failed(done, total, e.to_string()))
                .await;
            Err(e)
        }
    }
}

/// Stops at the first failure; later series are never attempted.
async fn write_groups(
    writer: &dyn SeriesWriter,
    handle: &JobHandle,
    groups: &[SubmissionGroup],
    total: usize,
) -> Result<(), WriteError> {
    for group in groups {
        let target = Path::new(&group.filepath);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        for series in &group.series {
            writer.write(target, &WriterInput::new(series, &group.interval)).await?;

            let done = handle.job.lock().await.record_written();
            handle.publish(ProgressEvent::write(
                WriteStatus::Writing,
                done,
                total,
                format!("Wrote {}", series.pathname),
            ));
            tokio::task::yield_now().await;
        }
    }
    Ok(())
}
