//! Client for the USGS NWIS water services.
//!
//! Provides the HTTP wrapper ([`api::UsgsApi`]), parsers for the JSON
//! time-series envelope and the tab-separated RDB text format, and the
//! station-name conventions used when listing sites by state.

pub mod api;
pub mod parse;
pub mod station;

pub use api::{UsgsApi, UsgsError};
pub use station::{parse_station_name, StationMeta};
