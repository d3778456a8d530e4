use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use hydrolink_core::types::{JobId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing control frames to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single progress connection.
pub struct WsConnection {
    /// Job whose progress this connection follows.
    pub job_id: JobId,
    /// Channel sender for outbound control frames.
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

/// Tracks every open progress connection so the heartbeat can ping them
/// and shutdown can close them.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the control channel so the caller can
    /// forward frames to the WebSocket sink.
    pub async fn add(&self, conn_id: String, job_id: JobId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            job_id,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of connections following `job_id`.
    pub async fn job_connection_count(&self, job_id: &str) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|conn| conn.job_id == job_id)
            .count()
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
