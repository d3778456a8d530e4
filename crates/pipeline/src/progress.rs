//! Client-side view of an import's progress.

use hydrolink_core::progress::{percent, ProgressEvent, WriteStatus};
use hydrolink_core::summary::StationSummary;

/// Folded state of every event seen so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportProgress {
    pub query_percent: u8,
    pub download_percent: u8,
    /// Never moves backwards within one import.
    pub write_percent: u8,
    pub query_label: String,
    pub download_label: String,
    pub write_label: String,
    pub write_status: Option<WriteStatus>,
    pub summary: Option<StationSummary>,
    pub error: Option<String>,
    pub finished: bool,
}

impl ImportProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the view.
    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Query { start, end, total } => {
                self.query_percent = percent(*end, *total);
                self.query_label = format!("Querying {start}-{end} of {total}");
            }
            ProgressEvent::Download { done, total } => {
                self.download_percent = percent(*done, *total);
                self.download_label = format!("Downloaded {done} of {total}");
            }
            ProgressEvent::Write {
                status,
                done,
                total,
                label,
                error,
            } => {
                let pct = match status {
                    WriteStatus::Done => 100,
                    _ => percent(*done, *total),
                };
                self.write_percent = self.write_percent.max(pct);
                self.write_status = Some(*status);
                if !label.is_empty() {
                    self.write_label = label.clone();
                }
                if error.is_some() {
                    self.error = error.clone();
                }
            }
            ProgressEvent::Done { summary, error } => {
                if summary.is_some() {
                    self.summary = summary.clone();
                }
                if error.is_some() {
                    self.error = error.clone();
                }
                self.finished = true;
            }
        }
    }
}
