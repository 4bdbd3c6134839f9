//! Answer reconciler
//!
//! Two independent arrival paths converge on one Answer per (interview,
//! question): the live transcript stream and the later video upload.
//! Either may get there first; both go through the same atomic upsert, so
//! arrival order and near-simultaneous calls cannot produce duplicates.

use crate::db;
use crate::error::{Error, Result};
use crate::models::TaskKind;
use crate::services::media_processor;
use crate::AppState;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// Record one transcript chunk. The target question is the interview's
/// current-question pointer; a chunk arriving before any question was
/// asked is rejected. Never blocks on scoring.
pub async fn on_transcript_chunk(
    state: &AppState,
    interview_id: Uuid,
    text: &str,
    timestamp: DateTime<Utc>,
    is_final: bool,
) -> Result<Uuid> {
    let interview = db::interviews::get_interview(&state.db, interview_id).await?;
    let question_id = interview.current_question_id.ok_or_else(|| {
        Error::NoActiveQuestion(format!("No question asked yet in interview {}", interview_id))
    })?;

    let answer_id =
        db::answers::upsert_for_transcript(&state.db, interview_id, question_id, Utc::now())
            .await?;
    db::transcripts::append_chunk(&state.db, answer_id, timestamp, text, is_final).await?;

    debug!(
        interview_id = %interview_id,
        answer_id = %answer_id,
        is_final,
        "Transcript chunk saved"
    );
    Ok(answer_id)
}

/// Record an uploaded recording for a question. Updates the same Answer
/// row the transcript path may already have created, then schedules
/// cropping and evaluation off the request path. Returns immediately.
pub async fn on_video_uploaded(
    state: &AppState,
    interview_id: Uuid,
    question_id: Uuid,
    recording_path: PathBuf,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<Uuid> {
    let question = db::questions::get_question(&state.db, question_id).await?;
    if question.interview_id != interview_id {
        return Err(Error::NotFound(format!(
            "Question {} does not belong to interview {}",
            question_id, interview_id
        )));
    }

    let duration_seconds = (end_time - start_time).num_milliseconds().max(0) as f64 / 1000.0;
    let answer_id = db::answers::upsert_for_upload(
        &state.db,
        interview_id,
        question_id,
        &recording_path.to_string_lossy(),
        start_time,
        end_time,
        duration_seconds,
    )
    .await?;

    let cropped_path = cropped_sibling(&recording_path);
    media_processor::spawn_crop(
        state.db.clone(),
        state.analyzer.clone(),
        answer_id,
        recording_path,
        cropped_path,
    );

    db::tasks::enqueue(&state.db, interview_id, Some(answer_id), TaskKind::EvaluateAnswer).await?;
    state.task_notify.notify_one();

    info!(
        interview_id = %interview_id,
        answer_id = %answer_id,
        "Recording uploaded, evaluation queued"
    );
    Ok(answer_id)
}

/// `cropped_` prefixed path next to the original recording
fn cropped_sibling(recording_path: &std::path::Path) -> PathBuf {
    let file_name = recording_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    recording_path.with_file_name(format!("cropped_{}", file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cropped_path_keeps_directory() {
        let path = PathBuf::from("/data/media/abc.webm");
        assert_eq!(
            cropped_sibling(&path),
            PathBuf::from("/data/media/cropped_abc.webm")
        );
    }
}
