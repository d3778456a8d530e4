//! DSS Payload Builder.
//!
//! Turns fetched results into per-variety submissions. Null points are
//! dropped and the rest sorted by timestamp before anything is emitted;
//! a result left with no points contributes no series entry. Output is a
//! pure function of the input, so rebuilding gives identical payloads.

use hydrolink_core::hec::{format_date, format_date_time, julian_day, sanitize_part, PathnameParts};
use hydrolink_core::interval::e_part;
use hydrolink_core::series::SeriesResult;
use hydrolink_core::submission::{
    DataFormat, DssSubmission, JsonSeriesEntry, JsonSubmission, SeriesPayload, STRUCTURE_TIME_SERIES,
};
use hydrolink_core::types::Timestamp;
use hydrolink_core::variety::{DataType, Variety};

/// F part used when a station row leaves it blank.
pub const DEFAULT_F_PART: &str = "USGS";

/// Data source recorded in plain-JSON payloads.
const SOURCE: &str = "USGS";

/// User-facing labels for one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportLabels {
    pub project: String,
    /// Display name; blank means "USGS Discharge" / "USGS Stage".
    pub name: String,
    /// Description; blank means a generated one.
    pub description: String,
}

impl ImportLabels {
    fn name_for(&self, variety: Variety) -> String {
        match self.name.trim() {
            "" => format!("USGS {}", variety.category()),
            name => name.to_string(),
        }
    }

    fn description_for(&self, generated: String) -> String {
        match self.description.trim() {
            "" => generated,
            desc => desc.to_string(),
        }
    }
}

/// Build the DSS submission for one variety.
///
/// Only results of `variety` are considered. The submission may carry no
/// series at all; it is still sent so the write job can count it.
pub fn build_dss_submission(
    results: &[SeriesResult],
    variety: Variety,
    data_type: DataType,
    labels: &ImportLabels,
) -> DssSubmission {
    let interval = e_part(data_type);
    let c_part = variety.c_part(data_type);

    let series: Vec<SeriesPayload> = results
        .iter()
        .filter(|r| r.variety == variety)
        .filter_map(|result| {
            let points = result.retained_points();
            let (first, _) = *points.first()?;

            let parts = PathnameParts {
                a: non_blank(&result.a_part, &result.station_id),
                b: result.b_part.clone(),
                c: c_part.to_string(),
                d: format_date(first),
                e: interval.to_string(),
                f: non_blank(&result.f_part, DEFAULT_F_PART),
            };

            Some(SeriesPayload {
                station_id: result.station_id.clone(),
                pathname: parts.to_pathname(),
                start_date_time: iso(first),
                values: points.iter().map(|(_, v)| *v).collect(),
                times: points.iter().map(|(ts, _)| julian_day(*ts)).collect(),
                units: variety.units().to_string(),
                value_type: data_type.value_type().to_string(),
            })
        })
        .collect();

    let filepath = variety.dss_file();
    let category = variety.category();

    DssSubmission {
        structure_type: STRUCTURE_TIME_SERIES.to_string(),
        data_format: DataFormat::Dss,
        data_type: category.to_string(),
        name: labels.name_for(variety),
        description: labels.description_for(format!(
            "USGS {category} imported into {filepath} for project {}",
            labels.project
        )),
        filepath: filepath.to_string(),
        pathname: series.iter().map(|s| s.pathname.clone()).collect(),
        units: variety.units().to_string(),
        value_type: data_type.value_type().to_string(),
        interval: interval.to_string(),
        series,
    }
}

/// Build the plain-JSON submission for one variety, or `None` when no
/// result of that variety kept any point.
pub fn build_json_submission(
    results: &[SeriesResult],
    variety: Variety,
    data_type: DataType,
    labels: &ImportLabels,
) -> Option<JsonSubmission> {
    let series: Vec<JsonSeriesEntry> = results
        .iter()
        .filter(|r| r.variety == variety)
        .filter_map(|result| {
            let points = result.retained_points();
            let times: Vec<String> = points.iter().map(|(ts, _)| format_date_time(*ts)).collect();
            let start_date_time = times.first()?.clone();
            let end_date_time = times.last()?.clone();

            Some(JsonSeriesEntry {
                station_id: result.station_id.clone(),
                a_part: sanitize_part(&result.a_part),
                b_part: sanitize_part(&result.b_part),
                f_part: sanitize_part(&result.f_part),
                start_date_time,
                end_date_time,
                values: points.iter().map(|(_, v)| *v).collect(),
                times,
            })
        })
        .collect();

    let primary = series.first()?.clone();
    let category = variety.category();

    Some(JsonSubmission {
        structure_type: STRUCTURE_TIME_SERIES.to_string(),
        data_format: DataFormat::Json,
        data_type: variety.parameter_label().to_string(),
        name: labels.name_for(variety),
        description: labels.description_for(format!(
            "USGS {category} imported for project {}",
            labels.project
        )),
        parameter: variety.parameter_label().to_string(),
        units: variety.units().to_string(),
        interval: e_part(data_type).to_string(),
        start_date_time: primary.start_date_time,
        end_date_time: primary.end_date_time,
        values: primary.values,
        times: primary.times,
        series,
        source: SOURCE.to_string(),
    })
}

/// Number of results of `variety`, i.e. how many series the builder
/// processes for it (with or without data).
pub fn processed_count(results: &[SeriesResult], variety: Variety) -> usize {
    results.iter().filter(|r| r.variety == variety).count()
}

fn non_blank(value: &str, fallback: &str) -> String {
    match value.trim() {
        "" => fallback.to_string(),
        v => v.to_string(),
    }
}

fn iso(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
