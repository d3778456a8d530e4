use std::sync::Arc;

use crate::config::ServerConfig;
use crate::jobs::{JobRegistry, WriteCoordinator};
use crate::store::JsonStore;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Live write jobs and their progress streams.
    pub jobs: Arc<JobRegistry>,
    /// Buffers submissions and drives the external writer.
    pub coordinator: Arc<WriteCoordinator>,
    /// Per-project JSON documents.
    pub store: Arc<JsonStore>,
    /// Open progress push connections.
    pub ws_manager: Arc<WsManager>,
}
