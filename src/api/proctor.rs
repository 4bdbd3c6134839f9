//! Proctor event logging endpoint
//!
//! The client reports what it observed; when a frame is attached, the
//! server re-analyzes it and appends its own findings to the notes instead
//! of replacing the client's, preserving both signals.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::events::PipelineEvent;
use crate::{db, AppState};

/// POST /api/interviews/{id}/proctor/event request
#[derive(Debug, Deserialize)]
pub struct ProctorEventRequest {
    pub event_type: String,
    pub confidence: f64,
    pub question_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
    /// Optional frame capture, possibly with a data-URL prefix
    pub frame_base64: Option<String>,
}

/// POST /api/interviews/{id}/proctor/event
pub async fn log_proctor_event(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
    Json(event): Json<ProctorEventRequest>,
) -> ApiResult<Json<Value>> {
    // Unknown interviews are rejected; proctor events are owned rows
    db::interviews::get_interview(&state.db, interview_id).await?;

    let mut notes = event.notes.clone();
    let mut frame_path: Option<String> = None;

    if let Some(ref frame_base64) = event.frame_base64 {
        match decode_frame(frame_base64) {
            Ok(bytes) => {
                let frames_dir = state.config.frames_dir();
                tokio::fs::create_dir_all(&frames_dir).await?;
                let path = frames_dir.join(format!(
                    "{}_{}_{}.jpg",
                    interview_id,
                    event.event_type,
                    Utc::now().format("%Y%m%d_%H%M%S")
                ));
                tokio::fs::write(&path, &bytes).await?;
                frame_path = Some(path.to_string_lossy().into_owned());

                let findings = state.analyzer.analyze_bytes(&bytes);
                if !findings.is_empty() {
                    let kinds: Vec<&str> = findings.iter().map(|f| f.kind.as_str()).collect();
                    notes.push_str(&format!(" [Server Verified: {}]", kinds.join(", ")));
                }
            }
            Err(e) => {
                // Frame problems never block the audit log entry
                warn!(interview_id = %interview_id, "Frame processing error: {}", e);
            }
        }
    }

    let confidence = event.confidence.clamp(0.0, 1.0);
    let timestamp = Utc::now();
    let event_id = db::proctor::insert_event(
        &state.db,
        interview_id,
        event.question_id,
        timestamp,
        &event.event_type,
        confidence,
        frame_path.as_deref(),
        &notes,
    )
    .await?;

    state.event_bus.emit(PipelineEvent::ProctorEventLogged {
        interview_id,
        event_type: event.event_type,
        confidence,
        timestamp,
    });

    Ok(Json(json!({ "status": "ok", "event_id": event_id })))
}

/// Decode a base64 frame, tolerating a `data:image/...;base64,` prefix
fn decode_frame(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = raw.rsplit_once(',').map(|(_, rest)| rest).unwrap_or(raw);
    BASE64.decode(payload.trim())
}

/// Build proctor routes
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/interviews/:interview_id/proctor/event",
        post(log_proctor_event),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_tolerates_data_url_prefix() {
        let encoded = BASE64.encode(b"frame-bytes");
        let with_prefix = format!("data:image/jpeg;base64,{}", encoded);
        assert_eq!(decode_frame(&with_prefix).unwrap(), b"frame-bytes");
        assert_eq!(decode_frame(&encoded).unwrap(), b"frame-bytes");
    }
}
