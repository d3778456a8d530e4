//! Write jobs: lifecycle, registry, and the coordinator that turns
//! buffered submissions into writer invocations.

pub mod clock;
pub mod coordinator;
pub mod job;
pub mod registry;
pub mod state;

pub use clock::{Clock, FakeClock, SystemClock};
pub use coordinator::WriteCoordinator;
pub use job::{Accepted, WriteJob};
pub use registry::{JobHandle, JobRegistry};
pub use state::JobState;
