//! Observer plumbing for write job progress.
//!
//! - [`ProgressBus`]: per-job subscriber list that remembers the latest
//!   event, replays it to late subscribers, and closes every subscriber
//!   once the job reaches a terminal state.
//! - [`Subscription`]: disposer handle; dropping it unsubscribes.

pub mod bus;

pub use bus::{ProgressBus, Subscription};
