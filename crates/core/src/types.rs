/// Opaque write job identifier (UUID v4 string).
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh write job id.
pub fn new_job_id() -> JobId {
    uuid::Uuid::new_v4().to_string()
}
