use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use hydrolink_core::error::CoreError;
use hydrolink_core::progress::ProgressEvent;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::jobs::JobHandle;
use crate::state::AppState;
use crate::ws::manager::WsManager;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub job_id: Option<String>,
}

/// GET /usgs/write-progress?jobId=
///
/// The job is looked up before the upgrade so an unknown id gets a plain
/// 404 instead of a socket.
pub async fn write_progress_handler(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> AppResult<Response> {
    let job_id = query
        .job_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("jobId is required".to_string()))?;

    let handle = state.jobs.get(&job_id).await.ok_or(CoreError::NotFound {
        entity: "WriteJob",
        id: job_id,
    })?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, handle, state.ws_manager)))
}

/// One text frame carrying the event JSON.
fn progress_message(event: &ProgressEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode progress event");
            None
        }
    }
}

/// Push one job's progress until its terminal event, the bus closing, or
/// the client leaving.
///
/// Leaving only drops this subscriber; the job itself is untouched.
async fn handle_socket(socket: WebSocket, handle: Arc<JobHandle>, ws_manager: Arc<WsManager>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let job_id = handle.id.clone();
    tracing::info!(conn_id = %conn_id, job_id = %job_id, "Progress stream connected");

    let mut control_rx = ws_manager.add(conn_id.clone(), job_id.clone()).await;
    // Replays the latest event first.
    let (subscription, mut events) = handle.subscribe();

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        let _subscription = subscription;
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let terminal = event.is_terminal();
                    if let Some(msg) = progress_message(&event) {
                        if sink.send(msg).await.is_err() {
                            tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                            return;
                        }
                    }
                    if terminal {
                        break;
                    }
                }
                msg = control_rx.recv() => {
                    let Some(msg) = msg else { break };
                    let closing = matches!(msg, Message::Close(_));
                    if sink.send(msg).await.is_err() || closing {
                        return;
                    }
                }
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    let recv_conn_id = conn_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => {
                    tracing::trace!(conn_id = %recv_conn_id, "Pong received");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(conn_id = %recv_conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Whichever side finishes first ends the connection.
    tokio::select! {
        _ = &mut send_task => {
            // Give the client a moment to answer our Close frame.
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), &mut recv_task).await;
            recv_task.abort();
        }
        _ = &mut recv_task => send_task.abort(),
    }

    ws_manager.remove(&conn_id).await;
    tracing::info!(conn_id = %conn_id, job_id = %job_id, "Progress stream disconnected");
}
