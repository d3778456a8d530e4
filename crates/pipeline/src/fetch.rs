//! Batch Fetch Orchestrator.
//!
//! Tasks run in consecutive batches of at most [`MAX_CONCURRENT`]. Each
//! batch emits a `query` event, issues every task concurrently, waits for
//! all of them to settle, then emits a cumulative `download` event. A
//! failed task becomes a [`SeriesResult`] carrying the error; nothing is
//! retried and nothing aborts the run.

use std::future::Future;

use futures::future::join_all;
use hydrolink_core::progress::ProgressEvent;
use hydrolink_core::series::{build_tasks, Point, QueryWindow, SeriesResult, StationRow, StationTask};
use hydrolink_core::variety::Variety;
use hydrolink_usgs::UsgsApi;

use crate::error::PipelineError;

/// Upper bound on concurrently in-flight upstream requests.
pub const MAX_CONCURRENT: usize = 10;

/// Anything that can fetch the points of one station/variety task.
pub trait SeriesSource: Send + Sync {
    fn fetch(
        &self,
        task: &StationTask,
    ) -> impl Future<Output = Result<Vec<Point>, PipelineError>> + Send;
}

impl SeriesSource for UsgsApi {
    async fn fetch(&self, task: &StationTask) -> Result<Vec<Point>, PipelineError> {
        Ok(self.fetch_time_series(task).await?)
    }
}

/// Expand stations × varieties and fetch every task.
pub async fn fetch_series<S, F>(
    source: &S,
    stations: &[StationRow],
    varieties: &[Variety],
    window: &QueryWindow,
    on_progress: F,
) -> Vec<SeriesResult>
where
    S: SeriesSource,
    F: FnMut(ProgressEvent),
{
    let tasks = build_tasks(stations, varieties, window);
    fetch_in_batches(source, &tasks, on_progress).await
}

/// Fetch `tasks` in batches, reporting progress through `on_progress`.
///
/// Results come back in task order.
pub async fn fetch_in_batches<S, F>(source: &S, tasks: &[StationTask], mut on_progress: F) -> Vec<SeriesResult>
where
    S: SeriesSource,
    F: FnMut(ProgressEvent),
{
    let total = tasks.len();
    let mut results = Vec::with_capacity(total);

    for (batch_index, batch) in tasks.chunks(MAX_CONCURRENT).enumerate() {
        let start = batch_index * MAX_CONCURRENT + 1;
        let end = start + batch.len() - 1;
        on_progress(ProgressEvent::Query { start, end, total });

        let settled = join_all(batch.iter().map(|task| fetch_one(source, task))).await;
        results.extend(settled);

        on_progress(ProgressEvent::Download {
            done: results.len(),
            total,
        });
    }

    results
}

async fn fetch_one<S: SeriesSource>(source: &S, task: &StationTask) -> SeriesResult {
    match source.fetch(task).await {
        Ok(points) => SeriesResult::fetched(task, points),
        Err(e) => {
            tracing::warn!(
                station = %task.station.id,
                variety = %task.variety,
                error = %e,
                "Series fetch failed",
            );
            SeriesResult::failed(task, e.to_string())
        }
    }
}
