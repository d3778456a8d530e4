//! Per-station reduction of an import run's results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::series::{SeriesResult, StationRow};

/// Counts of stations with data, without data, and failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    pub total_stations: usize,
    pub total_series_requested: usize,
    pub with_data_count: usize,
    pub no_data_count: usize,
    pub failed_count: usize,
    pub with_data_ids: Vec<String>,
    pub no_data_ids: Vec<String>,
    pub failed_ids: Vec<String>,
}

#[derive(Default, Clone, Copy)]
struct Flags {
    touched: bool,
    has_data: bool,
    error: bool,
}

/// Reduce every result to one verdict per station id.
///
/// A station with any failed task is failed; otherwise it has data if any
/// of its series has a non-null point; otherwise, if it produced results
/// at all, it has no data. Selected stations that produced no result are
/// in none of the lists. Id lists follow selection order, with ids that
/// only appear in the results appended in first-seen order.
pub fn build_station_summary(results: &[SeriesResult], stations: &[StationRow]) -> StationSummary {
    let mut order: Vec<&str> = Vec::with_capacity(stations.len());
    let mut flags: HashMap<&str, Flags> = HashMap::with_capacity(stations.len());

    for station in stations {
        if flags.insert(&station.id, Flags::default()).is_none() {
            order.push(&station.id);
        }
    }

    for result in results {
        let entry = flags.entry(&result.station_id).or_insert_with(|| {
            order.push(&result.station_id);
            Flags::default()
        });
        entry.touched = true;
        if result.error.is_some() {
            entry.error = true;
        } else if result.has_data() {
            entry.has_data = true;
        }
    }

    let mut summary = StationSummary {
        total_stations: stations.len(),
        total_series_requested: results.len(),
        ..Default::default()
    };

    for id in order {
        let entry = flags[id];
        if entry.error {
            summary.failed_ids.push(id.to_string());
        } else if entry.has_data {
            summary.with_data_ids.push(id.to_string());
        } else if entry.touched {
            summary.no_data_ids.push(id.to_string());
        }
    }

    summary.with_data_count = summary.with_data_ids.len();
    summary.no_data_count = summary.no_data_ids.len();
    summary.failed_count = summary.failed_ids.len();
    summary
}
