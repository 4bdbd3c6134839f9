//! HTTP fallback for transcript chunks
//!
//! The realtime channel is the normal path; this endpoint accepts the same
//! chunk shape over plain HTTP for clients without a socket.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::services::reconciler;
use crate::AppState;

/// POST /api/interviews/{id}/transcript request
#[derive(Debug, Deserialize)]
pub struct TranscriptChunkRequest {
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_final: bool,
}

/// POST /api/interviews/{id}/transcript
pub async fn save_transcript_chunk(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
    Json(chunk): Json<TranscriptChunkRequest>,
) -> ApiResult<Json<Value>> {
    let answer_id = reconciler::on_transcript_chunk(
        &state,
        interview_id,
        &chunk.text,
        chunk.timestamp.unwrap_or_else(Utc::now),
        chunk.is_final,
    )
    .await?;

    Ok(Json(json!({ "status": "ok", "answer_id": answer_id })))
}

/// Build transcript routes
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/interviews/:interview_id/transcript",
        post(save_transcript_chunk),
    )
}
