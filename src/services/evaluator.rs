//! Evaluation orchestrator
//!
//! Drives per-answer scoring and interview-level feedback. Everything here
//! runs either in the background worker or in the explicit admin paths;
//! gateway failures degrade to placeholder results and never fail a
//! client request.

use crate::db;
use crate::error::Result;
use crate::events::PipelineEvent;
use crate::models::{AnswerContext, AnswerEvaluation, Feedback};
use crate::services::aggregator::{self, ScoreSummary};
use crate::AppState;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// Answers shorter than this are skipped, not treated as errors
const MIN_ANSWER_CHARS: usize = 5;

/// Score one answer. Returns the stored evaluation, or None when the
/// transcript is too short to evaluate.
pub async fn evaluate_answer(
    state: &AppState,
    answer_id: Uuid,
) -> Result<Option<AnswerEvaluation>> {
    let answer = db::answers::get_answer(&state.db, answer_id).await?;
    let question = db::questions::get_question(&state.db, answer.question_id).await?;
    let answer_text = db::transcripts::final_text(&state.db, answer_id).await?;

    if answer_text.trim().len() < MIN_ANSWER_CHARS {
        info!(answer_id = %answer_id, "Answer text too short, skipping evaluation");
        return Ok(None);
    }

    let evaluation = state.gateway.score_answer(&question.text, &answer_text).await;
    db::answers::store_evaluation(&state.db, answer_id, &evaluation).await?;

    info!(
        answer_id = %answer_id,
        score = evaluation.score,
        "Answer evaluation stored"
    );
    state.event_bus.emit(PipelineEvent::AnswerEvaluated {
        interview_id: answer.interview_id,
        answer_id,
        score: evaluation.score,
        timestamp: Utc::now(),
    });

    Ok(Some(evaluation))
}

/// Collect the per-answer context the summarizer consumes, in question
/// order. Unscored answers show up with score 0 and an explanatory verdict.
async fn collect_contexts(state: &AppState, interview_id: Uuid) -> Result<Vec<AnswerContext>> {
    let answers = db::answers::list_for_interview(&state.db, interview_id).await?;

    let mut contexts = Vec::with_capacity(answers.len());
    for answer in answers {
        let question = db::questions::get_question(&state.db, answer.question_id).await?;
        let answer_text = db::transcripts::final_text(&state.db, answer.id).await?;
        contexts.push(AnswerContext {
            answer_id: answer.id,
            question: question.text,
            answer_text,
            score: answer.score.unwrap_or(0.0),
            verdict: answer
                .verdict
                .unwrap_or_else(|| "Not evaluated".to_string()),
        });
    }
    Ok(contexts)
}

/// Compute and persist the interview's overall assessment: local numeric
/// aggregation, gateway topic grouping, gateway narrative. Safe on zero
/// answers (zero score, empty topics).
pub async fn finalize_interview(
    state: &AppState,
    interview_id: Uuid,
) -> Result<(ScoreSummary, Feedback)> {
    // Reject unknown ids before doing any model work
    db::interviews::get_interview(&state.db, interview_id).await?;

    let contexts = collect_contexts(state, interview_id).await?;
    let scores: Vec<Option<f64>> = contexts.iter().map(|c| Some(c.score)).collect();
    let summary = aggregator::summarize(&scores);

    let topics = if contexts.is_empty() {
        Vec::new()
    } else {
        state.gateway.extract_topics(&contexts).await
    };
    let feedback = state
        .gateway
        .overall_feedback(&contexts, &summary, topics)
        .await;

    db::interviews::store_feedback(&state.db, interview_id, summary.overall_score, &feedback)
        .await?;

    info!(
        interview_id = %interview_id,
        overall_score = summary.overall_score,
        percent = summary.overall_score_percent,
        "Overall feedback stored"
    );
    state.event_bus.emit(PipelineEvent::InterviewCompleted {
        interview_id,
        overall_score: summary.overall_score,
        overall_score_percent: summary.overall_score_percent,
        timestamp: Utc::now(),
    });

    Ok((summary, feedback))
}

/// Re-run evaluation for every answer of the interview, then recompute
/// and overwrite the overall feedback. Idempotent; safe to repeat.
pub async fn recompute_interview(state: &AppState, interview_id: Uuid) -> Result<ScoreSummary> {
    // NotFound surfaces to the caller; this is an explicit admin request
    db::interviews::get_interview(&state.db, interview_id).await?;

    let answers = db::answers::list_for_interview(&state.db, interview_id).await?;
    for answer in &answers {
        if let Err(e) = evaluate_answer(state, answer.id).await {
            warn!(answer_id = %answer.id, "Re-evaluation failed, keeping previous score: {}", e);
        }
    }

    let (summary, _feedback) = finalize_interview(state, interview_id).await?;
    Ok(summary)
}
