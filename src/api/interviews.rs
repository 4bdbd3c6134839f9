//! Interview lifecycle endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{Answer, Interview, Question};
use crate::services::{aggregator, evaluator, session};
use crate::{db, AppState};

/// POST /api/interviews request
#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub candidate_email: String,
    pub application_id: Option<Uuid>,
}

/// POST /api/interviews response
#[derive(Debug, Serialize)]
pub struct CreateInterviewResponse {
    pub interview_id: Uuid,
    pub application_id: Option<Uuid>,
}

/// One question with its merged answer, as returned by the detail endpoint
#[derive(Debug, Serialize)]
pub struct QuestionWithAnswer {
    #[serde(flatten)]
    pub question: Question,
    pub answer: Option<Answer>,
}

/// GET /api/interviews/{id} response
#[derive(Debug, Serialize)]
pub struct InterviewDetailResponse {
    #[serde(flatten)]
    pub interview: Interview,
    pub questions: Vec<QuestionWithAnswer>,
}

/// POST /api/interviews
///
/// Start an interview. An application reference advances that application
/// to `interviewed` and may supply the candidate identity.
pub async fn create_interview(
    State(state): State<AppState>,
    Json(request): Json<CreateInterviewRequest>,
) -> ApiResult<Json<CreateInterviewResponse>> {
    let interview = session::start_interview(
        &state,
        &request.candidate_name,
        &request.candidate_email,
        request.application_id,
    )
    .await?;

    Ok(Json(CreateInterviewResponse {
        interview_id: interview.id,
        application_id: interview.application_id,
    }))
}

/// GET /api/interviews/recent
///
/// Recent interviews with question counts, newest first.
pub async fn recent_interviews(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let interviews = db::interviews::list_recent(&state.db, 50).await?;

    let entries: Vec<Value> = interviews
        .into_iter()
        .map(|(interview, question_count)| {
            let mut value = serde_json::to_value(&interview).unwrap_or_default();
            if let Some(map) = value.as_object_mut() {
                map.insert("question_count".to_string(), json!(question_count));
            }
            value
        })
        .collect();

    Ok(Json(json!({ "interviews": entries })))
}

/// GET /api/interviews/{id}
///
/// One interview with its questions and merged answers.
pub async fn get_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> ApiResult<Json<InterviewDetailResponse>> {
    let interview = db::interviews::get_interview(&state.db, interview_id).await?;
    let questions = db::questions::list_for_interview(&state.db, interview_id).await?;

    let mut with_answers = Vec::with_capacity(questions.len());
    for question in questions {
        let answer = db::answers::get_for_question(&state.db, question.id).await?;
        with_answers.push(QuestionWithAnswer { question, answer });
    }

    Ok(Json(InterviewDetailResponse {
        interview,
        questions: with_answers,
    }))
}

/// POST /api/interviews/{id}/complete
///
/// Mark completed and queue the overall-feedback computation. Completion
/// never waits on the model.
pub async fn complete_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    session::complete(&state, interview_id).await?;

    Ok(Json(json!({
        "status": "completed",
        "message": "Interview marked as completed",
    })))
}

/// POST /api/interviews/{id}/recompute
///
/// Explicit administrative re-evaluation: every answer is re-scored and
/// the overall feedback overwritten. Idempotent.
pub async fn recompute_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let summary = evaluator::recompute_interview(&state, interview_id).await?;

    Ok(Json(json!({
        "status": "completed",
        "message": "Assessment recomputed successfully",
        "overall_score": summary.overall_score,
        "overall_score_percent": summary.overall_score_percent,
    })))
}

/// GET /api/metrics/overview
///
/// Dashboard rollup. The average rescales sum-of-scores over sum-of-maxima
/// to [0, 5]; see `aggregator::dashboard_average`.
pub async fn metrics_overview(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let completed = db::interviews::completed_count(&state.db).await?;
    let rows = db::interviews::completed_score_rows(&state.db).await?;
    let avg_score = aggregator::dashboard_average(&rows);
    let pending_tasks = db::tasks::pending_count(&state.db).await?;

    Ok(Json(json!({
        "completedAssessments": completed,
        "avgScore": (avg_score * 100.0).round() / 100.0,
        "pendingTasks": pending_tasks,
    })))
}

/// Build interview routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/interviews", post(create_interview))
        .route("/api/interviews/recent", get(recent_interviews))
        .route("/api/interviews/:interview_id", get(get_interview))
        .route(
            "/api/interviews/:interview_id/complete",
            post(complete_interview),
        )
        .route(
            "/api/interviews/:interview_id/recompute",
            post(recompute_interview),
        )
        .route("/api/metrics/overview", get(metrics_overview))
}
