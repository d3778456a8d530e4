//! Import Driver: create job, subscribe, fetch, build, submit, observe.

use hydrolink_core::progress::{ProgressEvent, WriteStatus};
use hydrolink_core::series::{QueryWindow, SeriesResult, StationRow};
use hydrolink_core::submission::{CreateJobRequest, DataFormat, SubmissionEnvelope, SubmitResponse};
use hydrolink_core::summary::{build_station_summary, StationSummary};
use hydrolink_core::variety::Variety;

use crate::error::PipelineError;
use crate::fetch::{fetch_series, SeriesSource};
use crate::payload::{build_dss_submission, build_json_submission, processed_count, ImportLabels};
use crate::server::{ProgressStream, WriteServerClient};

/// Everything one import run needs.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub stations: Vec<StationRow>,
    /// Empty means flow only.
    pub varieties: Vec<Variety>,
    pub window: QueryWindow,
    pub data_format: DataFormat,
    /// Output directory on the server; `None` uses the project directory.
    pub dir: Option<String>,
    pub labels: ImportLabels,
}

/// What an import run did.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub summary: StationSummary,
    /// Series written (DSS) or stored (JSON).
    pub written: usize,
    /// No result kept any point, so nothing was submitted.
    pub nothing_to_import: bool,
}

/// Sequences one import against a source and a write server.
pub struct ImportDriver<S> {
    source: S,
    server: WriteServerClient,
}

impl<S: SeriesSource> ImportDriver<S> {
    pub fn new(source: S, server: WriteServerClient) -> Self {
        Self { source, server }
    }

    /// Run one import, reporting every event through `on_progress`.
    ///
    /// The last event emitted is always `done`, carrying the summary and,
    /// when the server-side write failed, its error.
    pub async fn run<F>(&self, request: &ImportRequest, mut on_progress: F) -> Result<ImportOutcome, PipelineError>
    where
        F: FnMut(&ProgressEvent),
    {
        if request.labels.project.trim().is_empty() {
            return Err(PipelineError::Invalid("project name is required".into()));
        }

        let varieties = if request.varieties.is_empty() {
            vec![Variety::Flow]
        } else {
            request.varieties.clone()
        };

        let outcome = match request.data_format {
            DataFormat::Dss => self.run_dss(request, &varieties, &mut on_progress).await,
            DataFormat::Json => self.run_json(request, &varieties, &mut on_progress).await,
        };

        match outcome {
            Ok(outcome) => {
                on_progress(&ProgressEvent::Done {
                    summary: Some(outcome.summary.clone()),
                    error: None,
                });
                Ok(outcome)
            }
            Err((summary, e)) => {
                on_progress(&ProgressEvent::Done {
                    summary,
                    error: Some(e.to_string()),
                });
                Err(e)
            }
        }
    }

    async fn fetch<F>(&self, request: &ImportRequest, varieties: &[Variety], on_progress: &mut F) -> Vec<SeriesResult>
    where
        F: FnMut(&ProgressEvent),
    {
        fetch_series(&self.source, &request.stations, varieties, &request.window, |e| {
            on_progress(&e)
        })
        .await
    }

    async fn run_dss<F>(
        &self,
        request: &ImportRequest,
        varieties: &[Variety],
        on_progress: &mut F,
    ) -> Result<ImportOutcome, (Option<StationSummary>, PipelineError)>
    where
        F: FnMut(&ProgressEvent),
    {
        let job_id = self
            .server
            .create_job(&CreateJobRequest {
                expected_total: None,
                expected_submissions: Some(varieties.len()),
            })
            .await
            .map_err(|e| (None, e))?;
        let mut stream = self.server.subscribe(&job_id).await.map_err(|e| (None, e))?;

        let results = self.fetch(request, varieties, on_progress).await;
        let summary = build_station_summary(&results, &request.stations);
        let fail = |e: PipelineError| (Some(summary.clone()), e);

        let submissions: Vec<_> = varieties
            .iter()
            .map(|&v| build_dss_submission(&results, v, request.window.data_type, &request.labels))
            .collect();
        let total: usize = submissions.iter().map(|s| s.series.len()).sum();

        if total == 0 {
            tracing::info!(job_id = %job_id, "Nothing to import");
            stream.close().await;
            return Ok(ImportOutcome {
                summary,
                written: 0,
                nothing_to_import: true,
            });
        }

        for &variety in varieties {
            let processed = processed_count(&results, variety);
            on_progress(&ProgressEvent::write(
                WriteStatus::Preparing,
                0,
                processed,
                format!("Preparing {} for DSS", variety.category()),
            ));
        }

        let mut envelopes = Vec::with_capacity(submissions.len());
        for (variety, submission) in varieties.iter().zip(submissions) {
            let data = serde_json::to_value(&submission)
                .map_err(|e| fail(PipelineError::Invalid(e.to_string())))?;
            envelopes.push(SubmissionEnvelope {
                category: variety.category().to_string(),
                data,
            });
        }

        let submit_all = async {
            let mut responses = Vec::with_capacity(envelopes.len());
            for envelope in &envelopes {
                let response = self
                    .server
                    .submit(&request.labels.project, request.dir.as_deref(), Some(&job_id), envelope)
                    .await?;
                tracing::debug!(job_id = %job_id, category = %envelope.category, ?response, "Submission accepted");
                responses.push(response);
            }
            Ok::<Vec<SubmitResponse>, PipelineError>(responses)
        };

        let terminal = observe(&mut stream, submit_all, on_progress).await.map_err(fail)?;
        stream.close().await;

        match terminal {
            ProgressEvent::Write {
                status: WriteStatus::Done,
                done,
                ..
            } => Ok(ImportOutcome {
                summary,
                written: done,
                nothing_to_import: false,
            }),
            other => Err(fail(PipelineError::WriteFailed(
                other.error().unwrap_or("write ended without completing").to_string(),
            ))),
        }
    }

    async fn run_json<F>(
        &self,
        request: &ImportRequest,
        varieties: &[Variety],
        on_progress: &mut F,
    ) -> Result<ImportOutcome, (Option<StationSummary>, PipelineError)>
    where
        F: FnMut(&ProgressEvent),
    {
        let results = self.fetch(request, varieties, on_progress).await;
        let summary = build_station_summary(&results, &request.stations);
        let fail = |e: PipelineError| (Some(summary.clone()), e);

        let submissions: Vec<_> = varieties
            .iter()
            .map(|&v| build_json_submission(&results, v, request.window.data_type, &request.labels))
            .collect();
        if submissions.iter().all(Option::is_none) {
            tracing::info!("Nothing to import");
            return Ok(ImportOutcome {
                summary,
                written: 0,
                nothing_to_import: true,
            });
        }

        let mut written = 0;
        for (&variety, submission) in varieties.iter().zip(submissions) {
            let processed = processed_count(&results, variety);
            let label = format!("Writing {} to JSON", variety.category());
            on_progress(&ProgressEvent::write(WriteStatus::Writing, 0, processed, label.clone()));

            if let Some(submission) = submission {
                let envelope = SubmissionEnvelope {
                    category: variety.category().to_string(),
                    data: serde_json::to_value(&submission)
                        .map_err(|e| fail(PipelineError::Invalid(e.to_string())))?,
                };
                self.server
                    .submit(&request.labels.project, request.dir.as_deref(), None, &envelope)
                    .await
                    .map_err(fail)?;
                written += submission.series.len();
            }

            on_progress(&ProgressEvent::write(WriteStatus::Done, processed, processed, label));
        }

        Ok(ImportOutcome {
            summary,
            written,
            nothing_to_import: false,
        })
    }
}

/// Drive `submit_all` while forwarding stream events, until the
/// submissions are done and a terminal write event has arrived.
///
/// A rejected submission ends the wait unless the terminal event that
/// explains it has already been seen. A timed-out submission does not:
/// the write it triggered keeps running server-side and its outcome
/// still arrives on the stream.
async fn observe<Fut, F>(
    stream: &mut ProgressStream,
    submit_all: Fut,
    on_progress: &mut F,
) -> Result<ProgressEvent, PipelineError>
where
    Fut: std::future::Future<Output = Result<Vec<SubmitResponse>, PipelineError>>,
    F: FnMut(&ProgressEvent),
{
    tokio::pin!(submit_all);
    let mut submitted = false;
    let mut terminal: Option<ProgressEvent> = None;

    loop {
        if submitted {
            if let Some(event) = terminal.take() {
                return Ok(event);
            }
        }

        tokio::select! {
            result = &mut submit_all, if !submitted => {
                submitted = true;
                if let Err(e) = result {
                    if terminal.is_some() {
                        tracing::warn!(error = %e, "Submission rejected after terminal event");
                    } else if e.is_timeout() {
                        tracing::warn!(error = %e, "Submission timed out; waiting for the write to finish");
                    } else {
                        return Err(e);
                    }
                }
            }
            next = stream.next_event(), if terminal.is_none() => match next {
                Some(Ok(event)) => {
                    on_progress(&event);
                    if event.is_terminal() {
                        terminal = Some(event);
                    }
                }
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(PipelineError::Stream(
                        "progress stream closed before the write finished".into(),
                    ));
                }
            },
        }
    }
}
