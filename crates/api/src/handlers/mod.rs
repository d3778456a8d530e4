pub mod data;
pub mod write_jobs;
