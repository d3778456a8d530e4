//! Station/variety fetch tasks and their results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;
use crate::variety::{DataType, TimeZoneMode, Variety};

/// One time/value sample. A `None` value is a gap in the upstream record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub timestamp: Timestamp,
    pub value: Option<f64>,
}

/// A station selected for import together with the pathname parts the
/// user assigned to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRow {
    pub id: String,
    #[serde(default)]
    pub a_part: String,
    #[serde(default)]
    pub b_part: String,
    #[serde(default)]
    pub f_part: String,
}

impl StationRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Query window and flags shared by every task of one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryWindow {
    pub data_type: DataType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Fetch the full period of record instead of a date range.
    #[serde(default)]
    pub retrieve_por: bool,
    #[serde(default)]
    pub time_zone: TimeZoneMode,
}

/// One (station, variety) pair to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationTask {
    pub station: StationRow,
    pub variety: Variety,
    pub window: QueryWindow,
}

/// Expand stations × varieties into tasks: stations outer, varieties
/// inner, both in input order.
pub fn build_tasks(
    stations: &[StationRow],
    varieties: &[Variety],
    window: &QueryWindow,
) -> Vec<StationTask> {
    stations
        .iter()
        .flat_map(|station| {
            varieties.iter().map(move |&variety| StationTask {
                station: station.clone(),
                variety,
                window: window.clone(),
            })
        })
        .collect()
}

/// Outcome of one [`StationTask`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesResult {
    pub station_id: String,
    pub a_part: String,
    pub b_part: String,
    pub f_part: String,
    pub points: Vec<Point>,
    pub variety: Variety,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SeriesResult {
    /// A successful fetch.
    pub fn fetched(task: &StationTask, points: Vec<Point>) -> Self {
        Self {
            station_id: task.station.id.clone(),
            a_part: task.station.a_part.clone(),
            b_part: task.station.b_part.clone(),
            f_part: task.station.f_part.clone(),
            points,
            variety: task.variety,
            error: None,
        }
    }

    /// A fetch that failed; carries no points.
    pub fn failed(task: &StationTask, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::fetched(task, Vec::new())
        }
    }

    /// Whether at least one point carries a value.
    pub fn has_data(&self) -> bool {
        self.points.iter().any(|p| p.value.is_some())
    }

    /// Non-null points sorted ascending by timestamp.
    ///
    /// The sort is stable, so equal timestamps keep upstream order.
    pub fn retained_points(&self) -> Vec<(Timestamp, f64)> {
        let mut kept: Vec<(Timestamp, f64)> = self
            .points
            .iter()
            .filter_map(|p| p.value.map(|v| (p.timestamp, v)))
            .collect();
        kept.sort_by_key(|(ts, _)| *ts);
        kept
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn window() -> QueryWindow {
        QueryWindow {
            data_type: DataType::Daily,
            start_date: None,
            end_date: None,
            retrieve_por: true,
            time_zone: TimeZoneMode::Utc,
        }
    }

    #[test]
    fn tasks_are_cartesian_product_in_stable_order() {
        let stations = vec![StationRow::new("A"), StationRow::new("B")];
        let tasks = build_tasks(&stations, &[Variety::Flow, Variety::Stage], &window());

        let order: Vec<(&str, Variety)> = tasks
            .iter()
            .map(|t| (t.station.id.as_str(), t.variety))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A", Variety::Flow),
                ("A", Variety::Stage),
                ("B", Variety::Flow),
                ("B", Variety::Stage),
            ]
        );
    }

    #[test]
    fn empty_selection_yields_no_tasks() {
        assert!(build_tasks(&[], &[Variety::Flow], &window()).is_empty());
        assert!(build_tasks(&[StationRow::new("A")], &[], &window()).is_empty());
    }

    #[test]
    fn retained_points_drop_nulls_and_sort() {
        let t = |d| Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).unwrap();
        let task = &build_tasks(&[StationRow::new("A")], &[Variety::Flow], &window())[0];
        let result = SeriesResult::fetched(
            task,
            vec![
                Point { timestamp: t(3), value: Some(3.0) },
                Point { timestamp: t(1), value: None },
                Point { timestamp: t(2), value: Some(2.0) },
            ],
        );

        assert!(result.has_data());
        assert_eq!(result.retained_points(), vec![(t(2), 2.0), (t(3), 3.0)]);
    }

    #[test]
    fn failed_result_has_no_data() {
        let task = &build_tasks(&[StationRow::new("A")], &[Variety::Stage], &window())[0];
        let result = SeriesResult::failed(task, "timeout");
        assert_eq!(result.error.as_deref(), Some("timeout"));
        assert!(!result.has_data());
        assert_eq!(result.variety, Variety::Stage);
    }
}
