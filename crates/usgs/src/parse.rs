//! Parsers for the two upstream response formats.
//!
//! - JSON time-series envelope (`dv`/`iv` services): the series lives at
//!   `value.timeSeries[0].values[0].value[]` as `{value, dateTime}` pairs
//!   with string values.
//! - RDB: tab-separated text, `#` comment lines, a header row, then a
//!   column-format row (`5s 15s ...`) before the data rows.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use hydrolink_core::series::Point;
use hydrolink_core::variety::{TimeZoneMode, Variety};
use serde::Deserialize;

use crate::api::UsgsError;

/// Upstream marker for a missing value.
pub const NO_DATA_VALUE: f64 = -999_999.0;

// ---------------------------------------------------------------------------
// JSON envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    value: EnvelopeValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeValue {
    #[serde(default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeries {
    #[serde(default)]
    source_info: Option<SourceInfo>,
    #[serde(default)]
    variable: Option<Variable>,
    #[serde(default)]
    values: Vec<ValueBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceInfo {
    #[serde(default)]
    time_zone_info: Option<TimeZoneInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeZoneInfo {
    #[serde(default)]
    default_time_zone: Option<ZoneOffset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneOffset {
    zone_offset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Variable {
    #[serde(default)]
    no_data_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ValueBlock {
    #[serde(default)]
    value: Vec<RawPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPoint {
    value: Option<String>,
    date_time: String,
}

/// Parse the JSON envelope into points.
///
/// An envelope with no series is an empty result, not an error. With
/// [`TimeZoneMode::LocalStandard`] offset-bearing timestamps are shifted
/// to the site's standard-time wall clock.
pub fn parse_time_series_json(body: &str, time_zone: TimeZoneMode) -> Result<Vec<Point>, UsgsError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| UsgsError::Parse(format!("time series JSON: {e}")))?;

    let Some(series) = envelope.value.time_series.into_iter().next() else {
        return Ok(Vec::new());
    };

    let no_data = series
        .variable
        .and_then(|v| v.no_data_value)
        .unwrap_or(NO_DATA_VALUE);

    let standard_offset = match time_zone {
        TimeZoneMode::Utc => None,
        TimeZoneMode::LocalStandard => series
            .source_info
            .and_then(|s| s.time_zone_info)
            .and_then(|t| t.default_time_zone)
            .and_then(|z| parse_zone_offset(&z.zone_offset)),
    };

    let Some(block) = series.values.into_iter().next() else {
        return Ok(Vec::new());
    };

    block
        .value
        .into_iter()
        .map(|raw| {
            let timestamp = parse_timestamp(&raw.date_time, standard_offset)?;
            let value = raw
                .value
                .as_deref()
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| *v != no_data);
            Ok(Point { timestamp, value })
        })
        .collect()
}

/// Parse `+HH:MM` / `-HH:MM` into a fixed offset.
fn parse_zone_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.as_bytes().first()? {
        b'-' => (-1, &raw[1..]),
        b'+' => (1, &raw[1..]),
        _ => (1, raw),
    };
    let (hours, minutes) = rest.split_once(':')?;
    let secs = hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60;
    FixedOffset::east_opt(sign * secs)
}

/// Offset-bearing timestamps become instants (optionally shifted to the
/// standard-time wall clock); naive ones are taken as already-correct
/// wall-clock times.
fn parse_timestamp(raw: &str, standard_offset: Option<FixedOffset>) -> Result<DateTime<Utc>, UsgsError> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        let utc = with_offset.with_timezone(&Utc);
        return Ok(match standard_offset {
            Some(offset) => utc.with_timezone(&offset).naive_local().and_utc(),
            None => utc,
        });
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .map(|naive| naive.and_utc())
        .map_err(|e| UsgsError::Parse(format!("timestamp '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// RDB
// ---------------------------------------------------------------------------

/// A parsed RDB table: header names plus data rows.
#[derive(Debug, Default)]
pub struct RdbTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RdbTable {
    /// Index of a column by header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Cell at `row`/`col`, trimmed; empty when the row is short.
    pub fn cell<'a>(&self, row: &'a [String], col: Option<usize>) -> &'a str {
        col.and_then(|c| row.get(c)).map(|s| s.trim()).unwrap_or("")
    }
}

/// Split RDB text into header and data rows.
///
/// Fewer than three non-comment lines (header, format row, one data row)
/// yields an empty table.
pub fn parse_rdb(text: &str) -> RdbTable {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    if lines.len() < 3 {
        return RdbTable::default();
    }

    let split = |line: &str| line.split('\t').map(str::to_string).collect::<Vec<_>>();
    RdbTable {
        header: split(lines[0]),
        rows: lines[2..].iter().map(|l| split(l)).collect(),
    }
}

/// Parse annual peaks for one variety.
///
/// Flow comes from `peak_va`, stage from `gage_ht`. Partial dates with a
/// `00` month or day are pinned to the first month/day.
pub fn parse_annual_peaks(text: &str, variety: Variety) -> Result<Vec<Point>, UsgsError> {
    let table = parse_rdb(text);
    if table.rows.is_empty() {
        return Ok(Vec::new());
    }

    let date_col = table
        .column("peak_dt")
        .ok_or_else(|| UsgsError::Parse("peak table has no peak_dt column".into()))?;
    let value_col = table.column(match variety {
        Variety::Stage => "gage_ht",
        _ => "peak_va",
    });

    let mut points = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let date = table.cell(row, Some(date_col));
        let Some(day) = parse_peak_date(date) else {
            tracing::debug!(date, "Skipping peak row with unparseable date");
            continue;
        };
        let value = table.cell(row, value_col).parse::<f64>().ok();
        points.push(Point {
            timestamp: day.and_time(NaiveTime::default()).and_utc(),
            value,
        });
    }
    Ok(points)
}

fn parse_peak_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next().and_then(|m| m.parse::<u32>().ok()).unwrap_or(0).max(1);
    let day = parts.next().and_then(|d| d.parse::<u32>().ok()).unwrap_or(0).max(1);
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    const IV_BODY: &str = r#"{
      "value": {
        "timeSeries": [{
          "sourceInfo": {"timeZoneInfo": {"defaultTimeZone": {"zoneOffset": "-05:00"}}},
          "variable": {"noDataValue": -999999.0},
          "values": [{"value": [
            {"value": "12.5", "dateTime": "2020-06-01T12:00:00.000-04:00"},
            {"value": "-999999", "dateTime": "2020-06-01T12:15:00.000-04:00"},
            {"value": "Ice", "dateTime": "2020-06-01T12:30:00.000-04:00"}
          ]}]
        }]
      }
    }"#;

    #[test]
    fn json_envelope_utc() {
        let points = parse_time_series_json(IV_BODY, TimeZoneMode::Utc).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(
            points[0].timestamp,
            Utc.with_ymd_and_hms(2020, 6, 1, 16, 0, 0).unwrap()
        );
        assert_eq!(points[0].value, Some(12.5));
        assert_eq!(points[1].value, None);
        assert_eq!(points[2].value, None);
    }

    #[test]
    fn json_envelope_local_standard_ignores_daylight_saving() {
        let points = parse_time_series_json(IV_BODY, TimeZoneMode::LocalStandard).unwrap();
        // 12:00 EDT is 16:00 UTC, which is 11:00 EST.
        assert_eq!(
            points[0].timestamp,
            Utc.with_ymd_and_hms(2020, 6, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn json_envelope_daily_naive_timestamps() {
        let body = r#"{"value":{"timeSeries":[{"values":[{"value":[
            {"value":"3","dateTime":"2019-01-02T00:00:00.000"}
        ]}]}]}}"#;
        let points = parse_time_series_json(body, TimeZoneMode::Utc).unwrap();
        assert_eq!(
            points[0].timestamp,
            Utc.with_ymd_and_hms(2019, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn json_envelope_without_series_is_empty() {
        let body = r#"{"value":{"timeSeries":[]}}"#;
        assert!(parse_time_series_json(body, TimeZoneMode::Utc).unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert_matches!(
            parse_time_series_json("<html>", TimeZoneMode::Utc),
            Err(UsgsError::Parse(_))
        );
    }

    const PEAKS: &str = "# USGS peak data\n\
agency_cd\tsite_no\tpeak_dt\tpeak_tm\tpeak_va\tgage_ht\n\
5s\t15s\t10d\t6s\t8s\t8s\n\
USGS\t01646500\t1936-03-19\t\t484000\t28.10\n\
USGS\t01646500\t1937-00-00\t\t\t12.00\n";

    #[test]
    fn annual_peaks_flow_and_stage_columns() {
        let flow = parse_annual_peaks(PEAKS, Variety::Flow).unwrap();
        assert_eq!(flow.len(), 2);
        assert_eq!(flow[0].value, Some(484000.0));
        assert_eq!(flow[1].value, None);
        assert_eq!(
            flow[1].timestamp,
            Utc.with_ymd_and_hms(1937, 1, 1, 0, 0, 0).unwrap()
        );

        let stage = parse_annual_peaks(PEAKS, Variety::Stage).unwrap();
        assert_eq!(stage[0].value, Some(28.1));
        assert_eq!(stage[1].value, Some(12.0));
    }

    #[test]
    fn rdb_with_only_header_is_empty() {
        let table = parse_rdb("# c\nsite_no\tstation_nm\n15s\t50s\n");
        assert!(table.rows.is_empty());
        assert!(table.header.is_empty());
    }
}
