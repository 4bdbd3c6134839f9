//! Answer table operations
//!
//! Both arrival paths (transcript stream and video upload) converge on the
//! same row through `INSERT ... ON CONFLICT(question_id) DO UPDATE ...
//! RETURNING id`, so creation is atomic and idempotent no matter which side
//! gets there first.

use crate::db::{parse_string_list, parse_timestamp, parse_uuid};
use crate::error::{Error, Result};
use crate::models::{Answer, AnswerEvaluation};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn answer_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Answer> {
    let start_time: Option<String> = row.get("start_time");
    let end_time: Option<String> = row.get("end_time");
    let strengths: Option<String> = row.get("strengths");
    let weaknesses: Option<String> = row.get("weaknesses");

    Ok(Answer {
        id: parse_uuid(row.get("id"))?,
        question_id: parse_uuid(row.get("question_id"))?,
        interview_id: parse_uuid(row.get("interview_id"))?,
        recording_path: row.get("recording_path"),
        cropped_recording_path: row.get("cropped_recording_path"),
        start_time: start_time.as_deref().map(parse_timestamp).transpose()?,
        end_time: end_time.as_deref().map(parse_timestamp).transpose()?,
        duration_seconds: row.get("duration_seconds"),
        score: row.get("score"),
        verdict: row.get("verdict"),
        strengths: parse_string_list(strengths),
        weaknesses: parse_string_list(weaknesses),
    })
}

/// Upsert from the transcript path. First contact creates the row with only
/// `start_time`; a later arrival leaves existing fields alone. Returns the
/// answer id either way.
pub async fn upsert_for_transcript(
    pool: &SqlitePool,
    interview_id: Uuid,
    question_id: Uuid,
    start_time: DateTime<Utc>,
) -> Result<Uuid> {
    let row = sqlx::query(
        r#"
        INSERT INTO answer (id, question_id, interview_id, start_time)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(question_id) DO UPDATE SET
            start_time = COALESCE(answer.start_time, excluded.start_time)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(question_id.to_string())
    .bind(interview_id.to_string())
    .bind(start_time.to_rfc3339())
    .fetch_one(pool)
    .await?;

    parse_uuid(row.get("id"))
}

/// Upsert from the upload path. Media fields always win on the upload side;
/// an existing `start_time` from the transcript path is preserved.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_for_upload(
    pool: &SqlitePool,
    interview_id: Uuid,
    question_id: Uuid,
    recording_path: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_seconds: f64,
) -> Result<Uuid> {
    let row = sqlx::query(
        r#"
        INSERT INTO answer (id, question_id, interview_id, recording_path, start_time, end_time, duration_seconds)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(question_id) DO UPDATE SET
            recording_path = excluded.recording_path,
            start_time = COALESCE(answer.start_time, excluded.start_time),
            end_time = excluded.end_time,
            duration_seconds = excluded.duration_seconds
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(question_id.to_string())
    .bind(interview_id.to_string())
    .bind(recording_path)
    .bind(start_time.to_rfc3339())
    .bind(end_time.to_rfc3339())
    .bind(duration_seconds)
    .fetch_one(pool)
    .await?;

    parse_uuid(row.get("id"))
}

/// Record the cropped recording path once post-processing finishes
pub async fn set_cropped_path(pool: &SqlitePool, answer_id: Uuid, path: &str) -> Result<()> {
    sqlx::query("UPDATE answer SET cropped_recording_path = ? WHERE id = ?")
        .bind(path)
        .bind(answer_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Load one answer; `NotFound` if unknown
pub async fn get_answer(pool: &SqlitePool, id: Uuid) -> Result<Answer> {
    let row = sqlx::query("SELECT * FROM answer WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Answer not found: {}", id)))?;

    answer_from_row(&row)
}

/// Answer for a given question, if any
pub async fn get_for_question(pool: &SqlitePool, question_id: Uuid) -> Result<Option<Answer>> {
    let row = sqlx::query("SELECT * FROM answer WHERE question_id = ?")
        .bind(question_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(answer_from_row).transpose()
}

/// All answers of an interview in question-sequence order
pub async fn list_for_interview(pool: &SqlitePool, interview_id: Uuid) -> Result<Vec<Answer>> {
    let rows = sqlx::query(
        r#"
        SELECT a.* FROM answer a
        JOIN question q ON a.question_id = q.id
        WHERE a.interview_id = ?
        ORDER BY q.seq
        "#,
    )
    .bind(interview_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(answer_from_row).collect()
}

/// Store an evaluation result. Unconditional overwrite: a late-arriving
/// evaluation for a recomputed interview just takes the slot (last write
/// wins) without touching the media fields.
pub async fn store_evaluation(
    pool: &SqlitePool,
    answer_id: Uuid,
    evaluation: &AnswerEvaluation,
) -> Result<()> {
    let strengths = serde_json::to_string(&evaluation.strengths)
        .map_err(|e| Error::Internal(format!("Failed to serialize strengths: {}", e)))?;
    let weaknesses = serde_json::to_string(&evaluation.weaknesses)
        .map_err(|e| Error::Internal(format!("Failed to serialize weaknesses: {}", e)))?;

    sqlx::query(
        "UPDATE answer SET score = ?, verdict = ?, strengths = ?, weaknesses = ? WHERE id = ?",
    )
    .bind(evaluation.score)
    .bind(&evaluation.verdict)
    .bind(strengths)
    .bind(weaknesses)
    .bind(answer_id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}
