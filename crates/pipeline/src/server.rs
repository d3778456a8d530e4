//! Client for the write server: job creation, submissions, and the
//! WebSocket progress stream.

use futures::StreamExt;
use hydrolink_core::progress::ProgressEvent;
use hydrolink_core::submission::{CreateJobRequest, CreateJobResponse, SubmissionEnvelope, SubmitResponse};
use hydrolink_core::types::JobId;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::PipelineError;

/// Project store bucket that import submissions go to.
pub const DATA_BUCKET: &str = "data";

/// Shape of the server's error responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for one write server.
#[derive(Clone)]
pub struct WriteServerClient {
    client: reqwest::Client,
    /// API root, e.g. `http://localhost:5000/api`.
    api_url: String,
}

impl WriteServerClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Create a write job and return its id.
    pub async fn create_job(&self, request: &CreateJobRequest) -> Result<JobId, PipelineError> {
        let response = self
            .client
            .post(format!("{}/usgs/write-job", self.api_url))
            .json(request)
            .send()
            .await?;

        let created: CreateJobResponse = Self::parse_response(response).await?;
        tracing::debug!(job_id = %created.job_id, "Write job created");
        Ok(created.job_id)
    }

    /// Post one submission to `/{project}/{bucket}`.
    pub async fn submit(
        &self,
        project: &str,
        dir: Option<&str>,
        job_id: Option<&str>,
        envelope: &SubmissionEnvelope,
    ) -> Result<SubmitResponse, PipelineError> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(dir) = dir {
            query.push(("dir", dir));
        }
        if let Some(job_id) = job_id {
            query.push(("jobId", job_id));
        }

        let response = self
            .client
            .post(format!("{}/{project}/{DATA_BUCKET}", self.api_url))
            .query(&query)
            .json(envelope)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Open the progress stream of a job.
    pub async fn subscribe(&self, job_id: &str) -> Result<ProgressStream, PipelineError> {
        let url = format!(
            "{}/usgs/write-progress?jobId={job_id}",
            ws_url(&self.api_url)
        );

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| PipelineError::Stream(format!("Failed to connect to {url}: {e}")))?;

        tracing::debug!(job_id, "Subscribed to write progress");
        Ok(ProgressStream { ws_stream })
    }

    // ---- private helpers ----

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PipelineError> {
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(PipelineError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

/// `http(s)://` to `ws(s)://`.
fn ws_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    }
}

/// Live progress subscription for one job.
pub struct ProgressStream {
    ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl ProgressStream {
    /// Next progress event, or `None` once the server closes the stream.
    ///
    /// Frames that do not parse as events are skipped.
    pub async fn next_event(&mut self) -> Option<Result<ProgressEvent, PipelineError>> {
        while let Some(frame) = self.ws_stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ProgressEvent>(&text) {
                    Ok(event) => return Some(Ok(event)),
                    Err(e) => {
                        tracing::warn!(error = %e, raw_message = %text, "Unparseable progress frame");
                    }
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "Progress stream closed");
                    return None;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(PipelineError::Stream(e.to_string()))),
            }
        }
        None
    }

    /// Close the connection.
    pub async fn close(mut self) {
        let _ = self.ws_stream.close(None).await;
    }
}
