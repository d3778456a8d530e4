//! Interval codes: the pathname E part and the write-merging heuristic.

use crate::variety::DataType;

/// E part for daily values.
pub const INTERVAL_DAILY: &str = "1Day";
/// E part for instantaneous (sub-hourly) values.
pub const INTERVAL_INSTANTANEOUS: &str = "15Minute";
/// E part for annual extremes, stored as an irregular series.
pub const INTERVAL_ANNUAL_PEAKS: &str = "IR-Century";

/// Prefix marking an irregular interval.
const IRREGULAR_PREFIX: &str = "IR-";

/// Interval code written into the pathname for a data type.
pub fn e_part(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Daily => INTERVAL_DAILY,
        DataType::Instantaneous => INTERVAL_INSTANTANEOUS,
        DataType::AnnualPeaks => INTERVAL_ANNUAL_PEAKS,
    }
}

/// Whether the interval is irregular (`IR-` prefixed, case-insensitive).
pub fn is_irregular(interval: &str) -> bool {
    interval
        .trim()
        .get(..IRREGULAR_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IRREGULAR_PREFIX))
}

/// Whether the interval is year-scale (`1Year`, `IR-Year`, ...).
pub fn is_year_scale(interval: &str) -> bool {
    interval.to_ascii_lowercase().contains("year")
}

/// Number of submissions that make up one coordinated write for this
/// interval when the job was not seeded with an explicit count.
///
/// Year-scale and irregular series arrive as a single submission; every
/// other interval is written as a flow/companion pair.
pub fn expected_requests(interval: &str) -> usize {
    if is_irregular(interval) || is_year_scale(interval) {
        1
    } else {
        2
    }
}
