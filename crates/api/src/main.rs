use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hydrolink_api::background;
use hydrolink_api::config::ServerConfig;
use hydrolink_api::jobs::{JobRegistry, SystemClock, WriteCoordinator};
use hydrolink_api::router::build_app_router;
use hydrolink_api::state::AppState;
use hydrolink_api::store::JsonStore;
use hydrolink_api::writer::ProcessWriter;
use hydrolink_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydrolink_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        data_root = %config.data_root.display(),
        writer = %config.writer.program,
        "Loaded server configuration",
    );

    // --- Write jobs ---
    let jobs = Arc::new(JobRegistry::new(Arc::new(SystemClock), config.jobs));
    let writer = Arc::new(ProcessWriter::new(&config.writer));
    let coordinator = Arc::new(WriteCoordinator::new(Arc::clone(&jobs), writer));

    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(background::job_sweep::run(
        Arc::clone(&jobs),
        config.jobs.sweep_interval,
        sweep_cancel.clone(),
    ));

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        jobs: Arc::clone(&jobs),
        coordinator,
        store: Arc::new(JsonStore::new(config.data_root.clone())),
        ws_manager: Arc::clone(&ws_manager),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Job sweep stopped");

    jobs.close_all().await;

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
