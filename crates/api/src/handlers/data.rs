//! Project bucket handlers.
//!
//! DSS submissions to the `data` bucket carrying a `jobId` go through the
//! write coordinator; everything else is stored only.

use axum::extract::{Path, Query, State};
use axum::Json;
use hydrolink_core::error::CoreError;
use hydrolink_core::submission::{DataFormat, SubmissionEnvelope, SubmissionGroup, SubmitResponse};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{data_format, Bucket};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketQuery {
    /// Directory overriding `{DATA_ROOT}/{project}`.
    pub dir: Option<String>,
    pub job_id: Option<String>,
}

/// GET /{project}/{bucket}
pub async fn get_bucket(
    State(state): State<AppState>,
    Path((project, bucket)): Path<(String, String)>,
    Query(query): Query<BucketQuery>,
) -> AppResult<Json<Value>> {
    let bucket: Bucket = bucket.parse()?;
    let dir = state.store.project_dir(&project, query.dir.as_deref())?;
    Ok(Json(state.store.load(&dir, bucket).await?))
}

/// POST /{project}/{bucket}
pub async fn submit(
    State(state): State<AppState>,
    Path((project, bucket)): Path<(String, String)>,
    Query(query): Query<BucketQuery>,
    Json(envelope): Json<SubmissionEnvelope>,
) -> AppResult<Json<SubmitResponse>> {
    let bucket: Bucket = bucket.parse()?;
    if envelope.category.trim().is_empty() {
        return Err(AppError::BadRequest("type is required".to_string()));
    }
    let dir = state.store.project_dir(&project, query.dir.as_deref())?;

    if bucket != Bucket::Data || data_format(&envelope.data) == DataFormat::Json {
        state.store.append(&dir, bucket, &envelope).await?;
        return Ok(Json(SubmitResponse::buffered()));
    }

    let mut group: SubmissionGroup = serde_json::from_value(envelope.data.clone())
        .map_err(|e| AppError::BadRequest(format!("Invalid submission data: {e}")))?;
    group = group.retain_eligible();

    let job_id = query.job_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
    let response = match job_id {
        Some(job_id) => {
            if state.jobs.get(job_id).await.is_none() {
                return Err(CoreError::NotFound {
                    entity: "WriteJob",
                    id: job_id.to_string(),
                }
                .into());
            }
            if !group.is_meta_only() {
                group.filepath = state
                    .store
                    .resolve_file(&dir, &group.filepath)?
                    .to_string_lossy()
                    .into_owned();
            }
            state.coordinator.submit(job_id, group).await?
        }
        None if group.is_meta_only() => SubmitResponse::meta_only(),
        None => {
            return Err(AppError::BadRequest(
                "jobId is required for DSS submissions with series".to_string(),
            ))
        }
    };

    state.store.append(&dir, bucket, &envelope).await?;
    Ok(Json(response))
}
