//! HEC conventions consumed by the external writer: the continuous day
//! index, calendar strings, and `/A/B/C/D/E/F/` pathnames.

use chrono::{TimeZone, Utc};

use crate::types::Timestamp;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Day-index epoch: 31 Dec 1899 00:00 UTC.
pub fn epoch() -> Timestamp {
    Utc.with_ymd_and_hms(1899, 12, 31, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Fractional days between the epoch and `ts`.
pub fn julian_day(ts: Timestamp) -> f64 {
    (ts - epoch()).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// `ddMMMyyyy` with an upper-case month, e.g. `05MAR2021`.
pub fn format_date(ts: Timestamp) -> String {
    ts.format("%d%b%Y").to_string().to_ascii_uppercase()
}

/// `ddMMMyyyy HH:mm`, e.g. `05MAR2021 14:30`.
pub fn format_date_time(ts: Timestamp) -> String {
    ts.format("%d%b%Y %H:%M").to_string().to_ascii_uppercase()
}

/// Replace path separators inside a pathname part with spaces and trim.
pub fn sanitize_part(part: &str) -> String {
    part.replace(['/', '\\'], " ").trim().to_string()
}

/// The six parts of a pathname, unsanitized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathnameParts {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
    pub e: String,
    pub f: String,
}

impl PathnameParts {
    /// Join the sanitized parts as `/A/B/C/D/E/F/`.
    pub fn to_pathname(&self) -> String {
        let parts = [&self.a, &self.b, &self.c, &self.d, &self.e, &self.f];
        let mut out = String::from("/");
        for part in parts {
            out.push_str(&sanitize_part(part));
            out.push('/');
        }
        out
    }
}
