//! Progress protocol shared by the fetch orchestrator, the write job
//! registry, and whatever renders progress to the user.
//!
//! On the wire every event is a JSON object tagged by `phase`:
//!
//! ```text
//! {"phase":"query","start":1,"end":10,"total":42}
//! {"phase":"download","done":10,"total":42}
//! {"phase":"write","status":"writing","done":3,"total":8,"label":"..."}
//! {"phase":"done","summary":{...}}
//! ```

use serde::{Deserialize, Serialize};

use crate::summary::StationSummary;

/// Stage of a write phase event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    /// Client side: building payloads before submission.
    Preparing,
    /// Server side: buffered submissions complete, writing begins.
    Starting,
    /// One more series has been written.
    Writing,
    /// Every buffered series was written.
    Done,
    /// The writer failed; remaining series were abandoned.
    Error,
}

/// Immutable snapshot of pipeline state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// A batch covering tasks `start..=end` (1-based) of `total` was issued.
    Query { start: usize, end: usize, total: usize },
    /// `done` of `total` tasks have settled.
    Download { done: usize, total: usize },
    Write {
        status: WriteStatus,
        done: usize,
        total: usize,
        #[serde(default)]
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<StationSummary>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ProgressEvent {
    pub fn write(status: WriteStatus, done: usize, total: usize, label: impl Into<String>) -> Self {
        ProgressEvent::Write {
            status,
            done,
            total,
            label: label.into(),
            error: None,
        }
    }

    pub fn write_failed(done: usize, total: usize, error: impl Into<String>) -> Self {
        let error = error.into();
        ProgressEvent::Write {
            status: WriteStatus::Error,
            done,
            total,
            label: format!("Write failed: {error}"),
            error: Some(error),
        }
    }

    /// Whether this event ends a write job or an import run.
    pub fn is_terminal(&self) -> bool {
        match self {
            ProgressEvent::Write { status, .. } => {
                matches!(status, WriteStatus::Done | WriteStatus::Error)
            }
            ProgressEvent::Done { .. } => true,
            _ => false,
        }
    }

    /// Terminal failure description, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            ProgressEvent::Write { error, .. } | ProgressEvent::Done { error, .. } => {
                error.as_deref()
            }
            _ => None,
        }
    }
}

/// Integer percentage `done / total`, clamped to `0..=100`; `0` when
/// `total` is zero.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn query_event_wire_format() {
        let json = serde_json::to_value(ProgressEvent::Query {
            start: 1,
            end: 10,
            total: 42,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"phase": "query", "start": 1, "end": 10, "total": 42})
        );
    }

    #[test]
    fn write_event_parses_without_optional_fields() {
        let event: ProgressEvent = serde_json::from_str(
            r#"{"phase":"write","status":"writing","done":2,"total":5}"#,
        )
        .unwrap();
        assert_matches!(
            event,
            ProgressEvent::Write { status: WriteStatus::Writing, done: 2, total: 5, .. }
        );
        assert!(!event.is_terminal());
    }

    #[test]
    fn write_failure_is_terminal_and_carries_error() {
        let event = ProgressEvent::write_failed(1, 3, "exit code 1");
        assert!(event.is_terminal());
        assert_eq!(event.error(), Some("exit code 1"));
    }

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 4), 100);
    }
}
