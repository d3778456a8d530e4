//! Station metadata from the site service.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parse::parse_rdb;

static STATION_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*?)(?: BELOW | NEAR | AT | NR )(.*)$").expect("valid regex")
});

/// A station available for import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationMeta {
    pub id: String,
    /// Stream name, e.g. `POTOMAC RIVER`.
    pub name: String,
    /// Town or landmark the gage is referenced to; may be empty.
    pub location: String,
}

/// Split a full station name into `(stream, location)` on the first
/// ` BELOW `, ` NEAR `, ` AT ` or ` NR ` (case-insensitive).
///
/// Names without a separator come back whole with an empty location.
pub fn parse_station_name(full_name: &str) -> (String, String) {
    if let Some(caps) = STATION_NAME_RE.captures(full_name) {
        let stream = caps.get(1).map_or("", |m| m.as_str()).trim();
        let town = caps.get(2).map_or("", |m| m.as_str()).trim();
        if !stream.is_empty() && !town.is_empty() {
            return (stream.to_string(), town.to_string());
        }
    }
    (full_name.trim().to_string(), String::new())
}

/// Parse the RDB site listing into station metadata.
///
/// Rows without a `site_no` are skipped.
pub fn parse_site_listing(text: &str) -> Vec<StationMeta> {
    let table = parse_rdb(text);
    let id_col = table.column("site_no");
    let name_col = table.column("station_nm");

    table
        .rows
        .iter()
        .filter_map(|row| {
            let id = table.cell(row, id_col);
            if id.is_empty() {
                return None;
            }
            let (name, location) = parse_station_name(table.cell(row, name_col));
            Some(StationMeta {
                id: id.to_string(),
                name,
                location,
            })
        })
        .collect()
}
