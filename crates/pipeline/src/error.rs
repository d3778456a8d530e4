use hydrolink_usgs::UsgsError;

/// Errors surfaced by the import client.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Usgs(#[from] UsgsError),

    /// The HTTP request to the write server failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The write server answered with a non-2xx status.
    #[error("Write server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The progress stream could not be opened or broke mid-import.
    #[error("Progress stream error: {0}")]
    Stream(String),

    /// The server-side write ended with an error event.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Invalid import request: {0}")]
    Invalid(String),
}

impl PipelineError {
    /// The request outlived a client or server timeout; the server may
    /// still be working on it.
    pub fn is_timeout(&self) -> bool {
        match self {
            PipelineError::Server { status, .. } => *status == 408,
            PipelineError::Request(e) => e.is_timeout(),
            _ => false,
        }
    }
}
