//! WebSocket progress streaming.
//!
//! One connection subscribes to exactly one session's stream. The socket
//! only pushes; client frames are drained solely to notice disconnects.
//! A dropped subscriber never affects the running pipeline.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use personaforge_domain::{ProgressEvent, SessionId, UserId};
use personaforge_shared::{progress_topic, ProgressMessage};

use crate::api::http::ApiError;
use crate::app::App;

pub fn routes() -> Router<Arc<App>> {
    Router::new().route("/ws/progress/{session_id}", get(progress_handler))
}

#[derive(Deserialize)]
struct ProgressQuery {
    user_id: Uuid,
}

/// Upgrade handler. Rejects before the upgrade when the session is
/// unknown, already closed, or owned by a different requester.
async fn progress_handler(
    ws: WebSocketUpgrade,
    State(app): State<Arc<App>>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<ProgressQuery>,
) -> Response {
    let session_id = SessionId::from_uuid(session_id);
    let requester_id = UserId::from_uuid(query.user_id);

    let Some(session) = app.sessions.get(session_id) else {
        return ApiError::NotFound.into_response();
    };
    if session.requester_id != requester_id {
        return ApiError::NotFound.into_response();
    }
    let Some(rx) = app.progress.join(session_id) else {
        // Stream already closed; the snapshot endpoint is the recovery
        // path for terminal sessions.
        return ApiError::NotFound.into_response();
    };

    tracing::debug!(
        topic = %progress_topic(query.user_id, session_id.to_uuid()),
        "progress subscriber joined"
    );
    ws.on_upgrade(move |socket| handle_socket(socket, rx, session_id))
}

async fn handle_socket(
    socket: WebSocket,
    mut rx: broadcast::Receiver<ProgressEvent>,
    session_id: SessionId,
) {
    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    let message = ProgressMessage::from(event);
                    if let Ok(json) = serde_json::to_string(&message) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    if terminal {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(%session_id, skipped, "progress subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        let _ = sender.close().await;
    });

    // Drain frames from the client until it disconnects.
    while let Some(Ok(frame)) = receiver.next().await {
        if matches!(frame, Message::Close(_)) {
            break;
        }
    }
    send_task.abort();
    tracing::debug!(%session_id, "progress subscriber left");
}
