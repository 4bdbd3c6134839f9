//! Question generation endpoint

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::QuestionKind;
use crate::services::session::{self, QuestionOptions};
use crate::AppState;

/// POST /api/interviews/{id}/questions/generate request. The body is
/// optional; both fields default.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuestionRequest {
    pub difficulty: Option<String>,
    pub language: Option<String>,
}

/// POST /api/interviews/{id}/questions/generate response
#[derive(Debug, Serialize)]
pub struct GenerateQuestionResponse {
    pub question: GeneratedQuestion,
}

#[derive(Debug, Serialize)]
pub struct GeneratedQuestion {
    pub id: Uuid,
    pub seq: i64,
    pub text: String,
    pub question_number: i64,
    pub total_questions: u32,
    pub question_type: QuestionKind,
}

/// POST /api/interviews/{id}/questions/generate
///
/// Allocate the next sequence position and generate its question text.
pub async fn generate_question(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
    request: Option<Json<GenerateQuestionRequest>>,
) -> ApiResult<Json<GenerateQuestionResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let options = QuestionOptions {
        difficulty: request.difficulty,
        language: request.language,
    };
    let question = session::next_question(&state, interview_id, options).await?;

    Ok(Json(GenerateQuestionResponse {
        question: GeneratedQuestion {
            id: question.id,
            seq: question.seq,
            text: question.text,
            question_number: question.seq,
            total_questions: state.config.total_questions(),
            question_type: question.source_tag,
        },
    }))
}

/// Build question routes
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/interviews/:interview_id/questions/generate",
        post(generate_question),
    )
}
