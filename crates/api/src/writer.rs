//! External DSS writer.
//!
//! The writer is a short-lived process run once per series: the target
//! file path is its last argument, the series JSON arrives on stdin, and a
//! zero exit code is the only success signal.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hydrolink_core::submission::WriterInput;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::config::WriterConfig;

/// Maximum stderr captured from one invocation (64 KiB).
const MAX_STDERR_BYTES: u64 = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Failed to run writer: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode writer input: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Writer timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Writer exited with code {code}: {stderr}")]
    ExitStatus { code: i32, stderr: String },
}

/// Writes one series into a target file.
#[async_trait]
pub trait SeriesWriter: Send + Sync {
    async fn write(&self, target: &Path, input: &WriterInput) -> Result<(), WriteError>;
}

/// Runs the configured external program for every series.
#[derive(Debug, Clone)]
pub struct ProcessWriter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessWriter {
    pub fn new(config: &WriterConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl SeriesWriter for ProcessWriter {
    async fn write(&self, target: &Path, input: &WriterInput) -> Result<(), WriteError> {
        let payload = serde_json::to_vec(input)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(target)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Killed if the timeout below drops the child.
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = cmd.spawn()?;

        // Drained concurrently so a chatty writer never blocks on a full pipe.
        let stderr_task = tokio::spawn(read_capped(child.stderr.take()));
        let stdin = child.stdin.take();
        let payload = &payload;
        let child_ref = &mut child;

        let run = async move {
            if let Some(mut stdin) = stdin {
                // The writer may exit before reading everything; its exit code decides.
                let _ = stdin.write_all(&payload).await;
                drop(stdin);
            }
            child_ref.wait().await
        };

        let status = match tokio::time::timeout(self.timeout, run).await {
            Ok(status) => status?,
            Err(_elapsed) => {
                stderr_task.abort();
                return Err(WriteError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
        };

        tracing::debug!(
            pathname = %input.pathname,
            target = %target.display(),
            code = ?status.code(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Writer finished",
        );

        if status.success() {
            return Ok(());
        }
        let stderr = stderr_task.await.unwrap_or_default();
        Err(WriteError::ExitStatus {
            code: status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        })
    }
}

/// Keep the first [`MAX_STDERR_BYTES`] and discard the rest until EOF.
async fn read_capped<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(MAX_STDERR_BYTES).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}
