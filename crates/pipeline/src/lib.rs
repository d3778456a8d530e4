//! Client side of the USGS import: batched fetching, payload building,
//! progress folding, and the driver that sequences them against a write
//! server.

pub mod driver;
pub mod error;
pub mod fetch;
pub mod payload;
pub mod progress;
pub mod server;

pub use driver::{ImportDriver, ImportOutcome, ImportRequest};
pub use error::PipelineError;
pub use fetch::{fetch_in_batches, fetch_series, SeriesSource, MAX_CONCURRENT};
pub use payload::ImportLabels;
pub use progress::ImportProgress;
pub use server::{ProgressStream, WriteServerClient};
