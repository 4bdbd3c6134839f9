//! Realtime transcript channel
//!
//! One websocket per recording client. The browser streams speech
//! recognition chunks as it hears them; each chunk is attached to the
//! interview's current question through the reconciler. Connections are
//! tracked per interview so monitoring can report live session counts.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::services::reconciler;
use crate::AppState;

/// Inbound websocket message
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    TranscriptChunk {
        text: String,
        timestamp: Option<DateTime<Utc>>,
        #[serde(default)]
        is_final: bool,
    },
}

/// GET /ws/interview/{id}
pub async fn interview_socket(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, interview_id, socket))
}

async fn handle_socket(state: AppState, interview_id: Uuid, mut socket: WebSocket) {
    let connection_id = state.connections.register(interview_id).await;
    info!(
        interview_id = %interview_id,
        connection_id = %connection_id,
        "Transcript socket connected"
    );

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                debug!(interview_id = %interview_id, "Socket error: {}", e);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                if let Err(e) = handle_text(&state, interview_id, &mut socket, &text).await {
                    warn!(interview_id = %interview_id, "Transcript chunk failed: {}", e);
                    let reply = json!({
                        "type": "error",
                        "message": e.to_string(),
                    });
                    if socket.send(Message::Text(reply.to_string())).await.is_err() {
                        break;
                    }
                }
            }
            Message::Ping(payload) => {
                if socket.send(Message::Pong(payload)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.connections.deregister(interview_id, connection_id).await;
    info!(
        interview_id = %interview_id,
        connection_id = %connection_id,
        "Transcript socket disconnected"
    );
}

async fn handle_text(
    state: &AppState,
    interview_id: Uuid,
    socket: &mut WebSocket,
    text: &str,
) -> Result<(), Error> {
    let message: ClientMessage = serde_json::from_str(text)
        .map_err(|e| Error::InvalidInput(format!("Unrecognized message: {}", e)))?;

    match message {
        ClientMessage::TranscriptChunk {
            text,
            timestamp,
            is_final,
        } => {
            let answer_id = reconciler::on_transcript_chunk(
                state,
                interview_id,
                &text,
                timestamp.unwrap_or_else(Utc::now),
                is_final,
            )
            .await?;

            // Acks let the client correlate chunks with the answer row
            let ack = json!({
                "type": "ack",
                "answer_id": answer_id,
                "is_final": is_final,
            });
            if socket.send(Message::Text(ack.to_string())).await.is_err() {
                debug!(interview_id = %interview_id, "Client gone before ack");
            }
        }
    }

    Ok(())
}

/// Build websocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws/interview/:interview_id", get(interview_socket))
}
