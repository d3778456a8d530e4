//! Shared domain model for the USGS import and DSS write pipeline.
//!
//! Everything here is plain data plus pure functions: station/variety
//! tasks, fetched series, submission payloads, the progress protocol, and
//! the HEC time and pathname conventions used by the external writer.

pub mod error;
pub mod hec;
pub mod interval;
pub mod progress;
pub mod series;
pub mod submission;
pub mod summary;
pub mod types;
pub mod variety;
