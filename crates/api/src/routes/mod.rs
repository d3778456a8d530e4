pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{data, write_jobs};
use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// ```text
/// POST /usgs/write-job                         create a write job
/// GET  /usgs/write-progress?jobId=             progress push stream (WebSocket)
///
/// GET  /{project}/{bucket}?dir=                read a bucket document
/// POST /{project}/{bucket}?dir=&jobId=         store / buffer / write a submission
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/usgs/write-job", post(write_jobs::create_write_job))
        .route("/usgs/write-progress", get(ws::write_progress_handler))
        .route(
            "/{project}/{bucket}",
            get(data::get_bucket).post(data::submit),
        )
}
