//! Answer upload and explicit evaluation endpoints

use axum::{
    extract::{Multipart, Path, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::{evaluator, reconciler};
use crate::AppState;

/// POST /api/interviews/{id}/answers/{question_id}/upload
///
/// Multipart upload of the answer recording plus `start_time`/`end_time`.
/// The file is written to the media folder and everything slow (cropping,
/// evaluation) happens off the request path. Responds with the resolved
/// answer id.
pub async fn upload_answer(
    State(state): State<AppState>,
    Path((interview_id, question_id)): Path<(Uuid, Uuid)>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut start_time: Option<DateTime<Utc>> = None;
    let mut end_time: Option<DateTime<Utc>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid file field: {}", e)))?;
                file_bytes = Some(bytes.to_vec());
            }
            "start_time" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid start_time: {}", e)))?;
                start_time = Some(parse_rfc3339("start_time", &raw)?);
            }
            "end_time" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid end_time: {}", e)))?;
                end_time = Some(parse_rfc3339("end_time", &raw)?);
            }
            _ => {}
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;
    let start_time =
        start_time.ok_or_else(|| ApiError::BadRequest("Missing start_time field".to_string()))?;
    let end_time =
        end_time.ok_or_else(|| ApiError::BadRequest("Missing end_time field".to_string()))?;

    let media_dir = state.config.media_dir();
    tokio::fs::create_dir_all(&media_dir).await?;
    let recording_path = media_dir.join(format!("{}_{}.webm", interview_id, question_id));
    tokio::fs::write(&recording_path, &file_bytes).await?;

    let answer_id = match reconciler::on_video_uploaded(
        &state,
        interview_id,
        question_id,
        recording_path.clone(),
        start_time,
        end_time,
    )
    .await
    {
        Ok(answer_id) => answer_id,
        Err(e) => {
            // A rejected upload must not leave the recording behind
            let _ = tokio::fs::remove_file(&recording_path).await;
            return Err(e.into());
        }
    };

    Ok(Json(json!({ "answer_id": answer_id })))
}

/// POST /api/interviews/{id}/answers/{answer_id}/evaluate
///
/// Synchronous explicit evaluation (admin path). A transcript too short to
/// evaluate responds with the zero-score placeholder rather than an error.
pub async fn evaluate_answer(
    State(state): State<AppState>,
    Path((interview_id, answer_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    let answer = crate::db::answers::get_answer(&state.db, answer_id).await?;
    if answer.interview_id != interview_id {
        return Err(ApiError::NotFound(format!(
            "Answer {} does not belong to interview {}",
            answer_id, interview_id
        )));
    }

    match evaluator::evaluate_answer(&state, answer_id).await? {
        Some(evaluation) => Ok(Json(serde_json::to_value(evaluation).unwrap_or_default())),
        None => Ok(Json(json!({
            "score": 0.0,
            "verdict": "No answer provided",
            "strengths": [],
            "weaknesses": ["No response recorded"],
        }))),
    }
}

fn parse_rfc3339(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::BadRequest(format!("Invalid {}: {}", field, e)))
}

/// Build answer routes
pub fn routes() -> Router<AppState> {
    Router::new()
        // Same parameter name in both paths: the upload target is a
        // question id, the evaluate target an answer id, and the router
        // requires consistent naming at the same position.
        .route(
            "/api/interviews/:interview_id/answers/:target_id/upload",
            post(upload_answer),
        )
        .route(
            "/api/interviews/:interview_id/answers/:target_id/evaluate",
            post(evaluate_answer),
        )
}
