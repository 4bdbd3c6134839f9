//! Session state machine: interview lifecycle and question sequencing
//!
//! States are `in_progress` then `completed` (terminal). Question sequence
//! numbers are allocated under a per-interview lock so concurrent
//! generation requests cannot duplicate or skip a position.

use crate::db;
use crate::error::Result;
use crate::events::PipelineEvent;
use crate::models::{Interview, Question, QuestionKind};
use crate::AppState;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Role description passed to the question generator
const JOB_ROLE: &str = "Telesales";

/// Caller overrides for question generation. Defaults leave difficulty to
/// the position-based policy and the question in the model's own language.
#[derive(Debug, Clone, Default)]
pub struct QuestionOptions {
    pub difficulty: Option<String>,
    pub language: Option<String>,
}

/// Create an interview in `in_progress`. When an application reference is
/// given, the application advances to `interviewed` and supplies candidate
/// identity if the caller left it blank.
pub async fn start_interview(
    state: &AppState,
    candidate_name: &str,
    candidate_email: &str,
    application_id: Option<Uuid>,
) -> Result<Interview> {
    let mut name = candidate_name.to_string();
    let mut email = candidate_email.to_string();

    if let Some(app_id) = application_id {
        if let Some((app_name, app_email)) =
            db::interviews::mark_application_interviewed(&state.db, app_id).await?
        {
            if name.is_empty() {
                name = app_name;
            }
            if email.is_empty() {
                email = app_email;
            }
        }
    }

    let started_at = Utc::now();
    let id = db::interviews::insert_interview(
        &state.db,
        &name,
        &email,
        application_id,
        started_at,
    )
    .await?;

    info!(interview_id = %id, candidate = %name, "Interview started");
    state.event_bus.emit(PipelineEvent::InterviewStarted {
        interview_id: id,
        timestamp: started_at,
    });

    db::interviews::get_interview(&state.db, id).await
}

/// Question kind for a 1-based position under the configured type policy:
/// resume questions first, then technical, then hr. Positions past the
/// configured total keep drawing hr questions.
pub fn kind_for_position(state: &AppState, position: u32) -> QuestionKind {
    let resume = state.config.resume_questions;
    let technical = state.config.technical_questions;
    if position <= resume {
        QuestionKind::Resume
    } else if position <= resume + technical {
        QuestionKind::Technical
    } else {
        QuestionKind::Hr
    }
}

/// Generate and record the next question. Sequence allocation is
/// serialized per interview; the inserted question becomes the
/// current-question pointer read by the reconciler.
pub async fn next_question(
    state: &AppState,
    interview_id: Uuid,
    options: QuestionOptions,
) -> Result<Question> {
    // Reject unknown interviews before calling out to the model
    db::interviews::get_interview(&state.db, interview_id).await?;

    let lock = state.interview_lock(interview_id).await;
    let _guard = lock.lock().await;

    let count = db::questions::count_for_interview(&state.db, interview_id).await?;
    let seq = count + 1;
    let position = seq as u32;
    let kind = kind_for_position(state, position);
    let total = state.config.total_questions();

    let text = state
        .gateway
        .generate_question(
            kind,
            position,
            total,
            JOB_ROLE,
            options.difficulty.as_deref(),
            options.language.as_deref(),
        )
        .await;

    let asked_at = Utc::now();
    let question_id =
        db::questions::insert_question(&state.db, interview_id, seq, &text, kind, asked_at)
            .await?;
    db::interviews::set_current_question(&state.db, interview_id, question_id).await?;

    info!(
        interview_id = %interview_id,
        question_id = %question_id,
        seq,
        kind = kind.as_str(),
        "Question generated"
    );
    state.event_bus.emit(PipelineEvent::QuestionAsked {
        interview_id,
        question_id,
        seq,
        timestamp: asked_at,
    });

    db::questions::get_question(&state.db, question_id).await
}

/// Transition to `completed`, stamp `ended_at`, and enqueue the
/// overall-feedback computation. `NotFound` for an unknown id; an
/// interview with zero answers completes with a zero overall score.
pub async fn complete(state: &AppState, interview_id: Uuid) -> Result<()> {
    db::interviews::mark_completed(&state.db, interview_id, Utc::now()).await?;

    db::tasks::enqueue(
        &state.db,
        interview_id,
        None,
        crate::models::TaskKind::FinalizeInterview,
    )
    .await?;
    state.task_notify.notify_one();

    info!(interview_id = %interview_id, "Interview completed, finalize queued");
    Ok(())
}
