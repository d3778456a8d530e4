//! Integration tests for write job creation, buffering, and writing.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, build_test_app_with, create_job, dss_envelope, post_json, FakeWriter};
use hydrolink_api::jobs::JobState;
use hydrolink_core::progress::{ProgressEvent, WriteStatus};
use serde_json::json;

/// Drain a finished job's stream.
async fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn statuses(events: &[ProgressEvent]) -> Vec<(WriteStatus, usize, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Write { status, done, total, .. } => Some((*status, *done, *total)),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Test: POST /write-job returns a job id, with or without a body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_job_returns_id() {
    let app = build_test_app();

    let id = create_job(app.router.clone(), json!({})).await;
    let seeded = create_job(app.router.clone(), json!({"expectedTotal": 4})).await;

    assert_ne!(id, seeded);
    assert_eq!(app.state.jobs.len().await, 2);
    let handle = app.state.jobs.get(&seeded).await.unwrap();
    assert_eq!(handle.job.lock().await.expected_total, 4);
}

#[tokio::test]
async fn create_job_rejects_malformed_body() {
    let app = build_test_app();

    for body in [json!([1, 2]), json!(3), json!({"expectedSubmisions": 2})] {
        let response = post_json(app.router.clone(), "/api/usgs/write-job", body).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    }
    assert!(app.state.jobs.is_empty().await);
}

// ---------------------------------------------------------------------------
// Test: daily interval buffers two submissions, then writes both series
// ---------------------------------------------------------------------------

#[tokio::test]
async fn daily_job_writes_after_second_submission() {
    let app = build_test_app();
    let id = create_job(app.router.clone(), json!({})).await;
    let uri = format!("/api/alpha/data?jobId={id}");

    let first = post_json(app.router.clone(), &uri, dss_envelope("1Day", "discharge.dss", &[3])).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await, json!({"success": true}));
    assert!(app.writer.calls().is_empty());

    let (_sub, rx) = app.state.jobs.get(&id).await.unwrap().subscribe();

    let second = post_json(app.router.clone(), &uri, dss_envelope("1Day", "stage.dss", &[2])).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await, json!({"success": true, "wrote": 2}));

    let calls = app.writer.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, app.data_root.path().join("alpha").join("discharge.dss"));
    assert_eq!(calls[1].0, app.data_root.path().join("alpha").join("stage.dss"));

    let events = statuses(&drain(rx).await);
    assert_eq!(
        events,
        vec![
            (WriteStatus::Starting, 0, 2),
            (WriteStatus::Writing, 1, 2),
            (WriteStatus::Writing, 2, 2),
            (WriteStatus::Done, 2, 2),
        ]
    );
    assert_eq!(events.iter().filter(|e| e.0 == WriteStatus::Done).count(), 1);
}

// ---------------------------------------------------------------------------
// Test: annual peaks write immediately
// ---------------------------------------------------------------------------

#[tokio::test]
async fn annual_peaks_write_on_first_submission() {
    let app = build_test_app();
    let id = create_job(app.router.clone(), json!({})).await;

    let response = post_json(
        app.router.clone(),
        &format!("/api/alpha/data?jobId={id}"),
        dss_envelope("IR-Century", "discharge.dss", &[1, 4, 2]),
    )
    .await;

    assert_eq!(body_json(response).await, json!({"success": true, "wrote": 3}));
    let handle = app.state.jobs.get(&id).await.unwrap();
    let job = handle.job.lock().await;
    assert_eq!(job.completed_count, 3);
    assert_eq!(job.expected_total, 3);
    assert_eq!(job.state, JobState::Done);
}

// ---------------------------------------------------------------------------
// Test: a writer failure abandons the remaining series
// ---------------------------------------------------------------------------

#[tokio::test]
async fn writer_failure_stops_the_write() {
    let app = build_test_app_with(FakeWriter::failing_on(2));
    let id = create_job(app.router.clone(), json!({})).await;
    let (_sub, rx) = app.state.jobs.get(&id).await.unwrap().subscribe();

    let response = post_json(
        app.router.clone(),
        &format!("/api/alpha/data?jobId={id}"),
        dss_envelope("IR-Century", "discharge.dss", &[1, 1, 1]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "WRITE_FAILED");
    assert!(json["error"].as_str().unwrap().contains("disk full"));

    assert_eq!(app.writer.calls().len(), 2);
    let handle = app.state.jobs.get(&id).await.unwrap();
    assert_eq!(handle.job.lock().await.completed_count, 1);
    assert_eq!(handle.job.lock().await.state, JobState::Failed);

    let events = drain(rx).await;
    let last = events.last().unwrap();
    assert_eq!(statuses(&events).last().unwrap(), &(WriteStatus::Error, 1, 3));
    assert!(last.error().unwrap().contains("disk full"));
}

// ---------------------------------------------------------------------------
// Test: protocol errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_job_returns_404() {
    let app = build_test_app();

    let response = post_json(
        app.router.clone(),
        "/api/alpha/data?jobId=missing",
        dss_envelope("IR-Century", "discharge.dss", &[1]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    assert!(app.writer.calls().is_empty());
}

#[tokio::test]
async fn submission_after_completion_conflicts() {
    let app = build_test_app();
    let id = create_job(app.router.clone(), json!({})).await;
    let uri = format!("/api/alpha/data?jobId={id}");

    post_json(app.router.clone(), &uri, dss_envelope("IR-Century", "discharge.dss", &[1])).await;
    let again = post_json(app.router.clone(), &uri, dss_envelope("IR-Century", "discharge.dss", &[1])).await;

    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(app.writer.calls().len(), 1);
}

#[tokio::test]
async fn series_without_job_id_is_rejected() {
    let app = build_test_app();

    let response = post_json(
        app.router.clone(),
        "/api/alpha/data",
        dss_envelope("1Day", "discharge.dss", &[2]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn escaping_output_path_is_rejected_without_touching_job() {
    let app = build_test_app();
    let id = create_job(app.router.clone(), json!({})).await;

    let response = post_json(
        app.router.clone(),
        &format!("/api/alpha/data?jobId={id}"),
        dss_envelope("IR-Century", "../outside.dss", &[1]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let handle = app.state.jobs.get(&id).await.unwrap();
    assert_eq!(
        handle.job.lock().await.state,
        JobState::Buffering { received: 0, expected: 0 }
    );
}

// ---------------------------------------------------------------------------
// Test: meta-only submissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn meta_only_submission_never_writes() {
    let app = build_test_app();
    let id = create_job(app.router.clone(), json!({})).await;

    let response = post_json(
        app.router.clone(),
        &format!("/api/alpha/data?jobId={id}"),
        dss_envelope("IR-Century", "discharge.dss", &[0]),
    )
    .await;

    assert_eq!(body_json(response).await, json!({"success": true, "metaOnly": true}));
    assert!(app.writer.calls().is_empty());
    let handle = app.state.jobs.get(&id).await.unwrap();
    assert_eq!(handle.bus.last(), None);
    assert_eq!(handle.job.lock().await.state, JobState::Buffering { received: 0, expected: 0 });
}

#[tokio::test]
async fn meta_only_submission_does_not_complete_unseeded_daily_buffer() {
    let app = build_test_app();
    let id = create_job(app.router.clone(), json!({})).await;
    let uri = format!("/api/alpha/data?jobId={id}");

    let first = post_json(app.router.clone(), &uri, dss_envelope("1Day", "discharge.dss", &[2])).await;
    assert_eq!(body_json(first).await, json!({"success": true}));

    let empty = post_json(app.router.clone(), &uri, dss_envelope("1Day", "stage.dss", &[0])).await;
    assert_eq!(body_json(empty).await, json!({"success": true, "metaOnly": true}));
    assert!(app.writer.calls().is_empty());

    let second = post_json(app.router.clone(), &uri, dss_envelope("1Day", "stage.dss", &[3])).await;
    assert_eq!(body_json(second).await, json!({"success": true, "wrote": 2}));
    assert_eq!(app.writer.calls().len(), 2);
}

#[tokio::test]
async fn meta_only_submission_counts_toward_seeded_buffer() {
    let app = build_test_app();
    let id = create_job(app.router.clone(), json!({"expectedSubmissions": 2})).await;
    let uri = format!("/api/alpha/data?jobId={id}");

    let first = post_json(app.router.clone(), &uri, dss_envelope("1Day", "discharge.dss", &[2])).await;
    assert_eq!(body_json(first).await, json!({"success": true}));

    let second = post_json(app.router.clone(), &uri, dss_envelope("1Day", "stage.dss", &[0])).await;
    assert_eq!(body_json(second).await, json!({"success": true, "wrote": 1}));
    assert_eq!(app.writer.calls().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: expiry sweep through the shared registry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_job_is_swept_after_grace_period() {
    let app = build_test_app();
    let id = create_job(app.router.clone(), json!({})).await;
    post_json(
        app.router.clone(),
        &format!("/api/alpha/data?jobId={id}"),
        dss_envelope("IR-Century", "discharge.dss", &[1]),
    )
    .await;

    assert_eq!(app.state.jobs.sweep().await, 0);
    app.clock.advance(std::time::Duration::from_secs(10));
    assert_eq!(app.state.jobs.sweep().await, 1);

    let response = post_json(
        app.router.clone(),
        &format!("/api/alpha/data?jobId={id}"),
        dss_envelope("IR-Century", "discharge.dss", &[1]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
