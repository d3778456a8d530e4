//! Submission payloads exchanged between the import client and the write
//! server, and the per-series input handed to the external writer.

use serde::{Deserialize, Serialize};

/// Structure type tag carried by every time-series payload.
pub const STRUCTURE_TIME_SERIES: &str = "TimeSeries";

/// Output format of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataFormat {
    /// Binary HEC-DSS file written by the external writer.
    #[default]
    Dss,
    /// Plain JSON kept in the project store.
    Json,
}

// ---------------------------------------------------------------------------
// DSS path
// ---------------------------------------------------------------------------

/// One station/variety series destined for the external writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPayload {
    #[serde(default)]
    pub station_id: String,
    pub pathname: String,
    #[serde(default)]
    pub start_date_time: String,
    #[serde(default)]
    pub values: Vec<f64>,
    /// Day-index timestamps (see [`crate::hec::julian_day`]).
    #[serde(default)]
    pub times: Vec<f64>,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub value_type: String,
}

impl SeriesPayload {
    /// A series is writable when it has a pathname, at least one value,
    /// and one time per value.
    pub fn is_eligible(&self) -> bool {
        !self.pathname.trim().is_empty()
            && !self.values.is_empty()
            && self.values.len() == self.times.len()
    }
}

/// One HTTP submission's worth of series for a write job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionGroup {
    #[serde(default)]
    pub series: Vec<SeriesPayload>,
    /// Interval code shared by every series in the group.
    #[serde(default)]
    pub interval: String,
    /// Output file, relative to the project directory.
    #[serde(default)]
    pub filepath: String,
}

impl SubmissionGroup {
    /// Drop series that cannot be written.
    pub fn retain_eligible(mut self) -> Self {
        self.series.retain(SeriesPayload::is_eligible);
        self
    }

    /// True when no series would be written ("meta only").
    pub fn is_meta_only(&self) -> bool {
        self.series.is_empty()
    }
}

/// JSON document piped to the external writer's stdin for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterInput {
    pub pathname: String,
    pub start_date_time: String,
    pub interval: String,
    pub values: Vec<f64>,
    pub times: Vec<f64>,
    pub units: String,
    pub value_type: String,
}

impl WriterInput {
    pub fn new(series: &SeriesPayload, interval: &str) -> Self {
        Self {
            pathname: series.pathname.clone(),
            start_date_time: series.start_date_time.clone(),
            interval: interval.to_string(),
            values: series.values.clone(),
            times: series.times.clone(),
            units: series.units.clone(),
            value_type: series.value_type.clone(),
        }
    }
}

/// The `data` object of a DSS submission as built by the import client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DssSubmission {
    pub structure_type: String,
    pub data_format: DataFormat,
    pub data_type: String,
    pub name: String,
    pub description: String,
    pub filepath: String,
    pub pathname: Vec<String>,
    pub units: String,
    pub value_type: String,
    pub interval: String,
    pub series: Vec<SeriesPayload>,
}

impl DssSubmission {
    /// The write-relevant part of this submission.
    pub fn group(&self) -> SubmissionGroup {
        SubmissionGroup {
            series: self.series.clone(),
            interval: self.interval.clone(),
            filepath: self.filepath.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON path
// ---------------------------------------------------------------------------

/// One station's series in a plain-JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSeriesEntry {
    pub station_id: String,
    pub a_part: String,
    pub b_part: String,
    pub f_part: String,
    pub start_date_time: String,
    pub end_date_time: String,
    pub values: Vec<f64>,
    /// `ddMMMyyyy HH:mm` strings.
    pub times: Vec<String>,
}

/// The `data` object of a plain-JSON submission.
///
/// The first series is lifted into the top-level fields so single-series
/// consumers can read it without looking at `series`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSubmission {
    pub structure_type: String,
    pub data_format: DataFormat,
    pub data_type: String,
    pub name: String,
    pub description: String,
    pub parameter: String,
    pub units: String,
    pub interval: String,
    pub start_date_time: String,
    pub end_date_time: String,
    pub values: Vec<f64>,
    pub times: Vec<String>,
    pub series: Vec<JsonSeriesEntry>,
    pub source: String,
}

// ---------------------------------------------------------------------------
// Envelope and response
// ---------------------------------------------------------------------------

/// Request body of `POST /write-job`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateJobRequest {
    /// Seed for the job's expected series total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_total: Option<usize>,
    /// Number of submissions that make up the write; overrides the
    /// interval heuristic when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_submissions: Option<usize>,
}

/// Response body of `POST /write-job`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub job_id: String,
}

/// Request body of `POST /{project}/{bucket}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionEnvelope {
    /// Store category (e.g. `Discharge`).
    #[serde(rename = "type")]
    pub category: String,
    pub data: serde_json::Value,
}

/// Response body of `POST /{project}/{bucket}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrote: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_only: Option<bool>,
}

impl SubmitResponse {
    /// Accepted and buffered; nothing written yet.
    pub fn buffered() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn wrote(count: usize) -> Self {
        Self {
            success: true,
            wrote: Some(count),
            meta_only: None,
        }
    }

    pub fn meta_only() -> Self {
        Self {
            success: true,
            wrote: None,
            meta_only: Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: usize, times: usize) -> SeriesPayload {
        SeriesPayload {
            station_id: "01".into(),
            pathname: "/A/B/FLOW/01JAN2000/1Day/USGS/".into(),
            start_date_time: "2000-01-01T00:00:00Z".into(),
            values: vec![1.0; values],
            times: vec![36525.0; times],
            units: "CFS".into(),
            value_type: "PER-AVER".into(),
        }
    }

    #[test]
    fn eligibility_requires_matching_arrays() {
        assert!(series(2, 2).is_eligible());
        assert!(!series(0, 0).is_eligible());
        assert!(!series(2, 1).is_eligible());
    }

    #[test]
    fn retain_eligible_can_leave_meta_only_group() {
        let group = SubmissionGroup {
            series: vec![series(0, 0), series(3, 2)],
            interval: "1Day".into(),
            filepath: "discharge.dss".into(),
        }
        .retain_eligible();

        assert!(group.is_meta_only());
    }

    #[test]
    fn group_deserializes_from_submission_data() {
        let data = serde_json::json!({
            "dataFormat": "DSS",
            "name": "USGS Discharge",
            "filepath": "discharge.dss",
            "interval": "IR-Century",
            "series": [{
                "pathname": "/A//FLOW-ANNUAL PEAK/01JAN1950/IR-Century/USGS/",
                "values": [100.0],
                "times": [18263.0]
            }]
        });

        let group: SubmissionGroup = serde_json::from_value(data).unwrap();

        assert_eq!(group.interval, "IR-Century");
        assert_eq!(group.series.len(), 1);
        assert!(group.series[0].is_eligible());
    }

    #[test]
    fn create_job_request_accepts_empty_body() {
        let req: CreateJobRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, CreateJobRequest::default());

        let req: CreateJobRequest =
            serde_json::from_str(r#"{"expectedTotal":4,"expectedSubmissions":3}"#).unwrap();
        assert_eq!(req.expected_total, Some(4));
        assert_eq!(req.expected_submissions, Some(3));

        assert!(serde_json::from_str::<CreateJobRequest>(r#"{"expectedTotl":4}"#).is_err());
    }

    #[test]
    fn responses_omit_absent_fields() {
        let json = serde_json::to_value(SubmitResponse::buffered()).unwrap();
        assert_eq!(json, serde_json::json!({"success": true}));

        let json = serde_json::to_value(SubmitResponse::meta_only()).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "metaOnly": true}));
    }
}
