#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use hydrolink_api::config::{JobConfig, ServerConfig, WriterConfig};
use hydrolink_api::jobs::{FakeClock, JobRegistry, WriteCoordinator};
use hydrolink_api::router::build_app_router;
use hydrolink_api::state::AppState;
use hydrolink_api::store::JsonStore;
use hydrolink_api::writer::{SeriesWriter, WriteError};
use hydrolink_api::ws::WsManager;
use hydrolink_core::submission::WriterInput;

/// Build a test `ServerConfig` rooted at `data_root`.
pub fn test_config(data_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        data_root: data_root.to_path_buf(),
        writer: WriterConfig {
            program: "true".to_string(),
            args: Vec::new(),
            timeout: std::time::Duration::from_secs(5),
        },
        jobs: JobConfig::default(),
    }
}

/// Writer that records every call instead of spawning a process.
#[derive(Default)]
pub struct FakeWriter {
    calls: Mutex<Vec<(PathBuf, String)>>,
    /// 1-based call number that fails with exit code 1.
    fail_on: Option<usize>,
    /// Time every write takes.
    delay: Option<std::time::Duration>,
}

impl FakeWriter {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// `(target, pathname)` of every attempted write, in order.
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SeriesWriter for FakeWriter {
    async fn write(&self, target: &Path, input: &WriterInput) -> Result<(), WriteError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((target.to_path_buf(), input.pathname.clone()));
            calls.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on == Some(call) {
            return Err(WriteError::ExitStatus {
                code: 1,
                stderr: "disk full".to_string(),
            });
        }
        Ok(())
    }
}

/// A router plus handles on everything the tests need to inspect.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub writer: Arc<FakeWriter>,
    pub clock: Arc<FakeClock>,
    pub data_root: TempDir,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(FakeWriter::default())
}

/// Build the full application router with the production middleware
/// stack, a fake writer, a fake clock, and a temporary data root.
pub fn build_test_app_with(writer: FakeWriter) -> TestApp {
    build_test_app_configured(writer, |_| {})
}

/// Like [`build_test_app_with`], letting the caller adjust the config.
pub fn build_test_app_configured(writer: FakeWriter, configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let data_root = tempfile::tempdir().unwrap();
    let mut config = test_config(data_root.path());
    configure(&mut config);

    let clock = Arc::new(FakeClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
    let writer = Arc::new(writer);
    let jobs = Arc::new(JobRegistry::new(clock.clone(), config.jobs));
    let coordinator = Arc::new(WriteCoordinator::new(Arc::clone(&jobs), writer.clone()));

    let state = AppState {
        config: Arc::new(config.clone()),
        jobs,
        coordinator,
        store: Arc::new(JsonStore::new(data_root.path())),
        ws_manager: Arc::new(WsManager::new()),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        writer,
        clock,
        data_root,
    }
}

/// Serve `router` on an ephemeral port; returns the `/api` base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a write job and return its id.
pub async fn create_job(app: Router, body: serde_json::Value) -> String {
    let response = post_json(app, "/api/usgs/write-job", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["jobId"].as_str().unwrap().to_string()
}

/// A DSS submission envelope with one series per entry of `value_counts`.
pub fn dss_envelope(interval: &str, filepath: &str, value_counts: &[usize]) -> serde_json::Value {
    let series: Vec<_> = value_counts
        .iter()
        .enumerate()
        .map(|(i, n)| {
            serde_json::json!({
                "stationId": format!("0164650{i}"),
                "pathname": format!("/0164650{i}//FLOW/01JAN2000/{interval}/USGS/"),
                "startDateTime": "2000-01-01T00:00:00Z",
                "values": vec![1.5; *n],
                "times": vec![36525.0; *n],
                "units": "CFS",
                "valueType": "PER-AVER",
            })
        })
        .collect();

    serde_json::json!({
        "type": "Discharge",
        "data": {
            "structureType": "TimeSeries",
            "dataFormat": "DSS",
            "dataType": "daily",
            "name": format!("USGS Discharge {interval}"),
            "description": "test import",
            "filepath": filepath,
            "interval": interval,
            "series": series,
        }
    })
}
