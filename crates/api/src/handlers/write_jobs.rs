use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use hydrolink_core::submission::{CreateJobRequest, CreateJobResponse};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /usgs/write-job
///
/// Register a write job. The body is optional; an empty body creates a job
/// that relies on the interval heuristic.
pub async fn create_write_job(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<CreateJobResponse>)> {
    let seed = if body.iter().all(u8::is_ascii_whitespace) {
        CreateJobRequest::default()
    } else {
        parse_seed(&body)?
    };

    let handle = state.jobs.create(&seed).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateJobResponse {
            job_id: handle.id.clone(),
        }),
    ))
}

/// The body must be a JSON object; serde would otherwise read a sequence
/// positionally into the struct fields.
fn parse_seed(body: &[u8]) -> AppResult<CreateJobRequest> {
    let invalid = |e: serde_json::Error| AppError::BadRequest(format!("Invalid write job request: {e}"));

    let value: serde_json::Value = serde_json::from_slice(body).map_err(invalid)?;
    if !value.is_object() {
        return Err(AppError::BadRequest(
            "Invalid write job request: expected a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(invalid)
}
