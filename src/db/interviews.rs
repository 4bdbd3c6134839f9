//! Interview table operations

use crate::db::{parse_timestamp, parse_uuid};
use crate::error::{Error, Result};
use crate::models::{Feedback, Interview, InterviewStatus};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn interview_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Interview> {
    let status_raw: String = row.get("status");
    let status = InterviewStatus::parse(&status_raw)
        .ok_or_else(|| Error::Internal(format!("Unknown interview status: {}", status_raw)))?;

    let started_at: String = row.get("started_at");
    let ended_at: Option<String> = row.get("ended_at");
    let application_id: Option<String> = row.get("application_id");
    let current_question_id: Option<String> = row.get("current_question_id");
    let feedback_raw: Option<String> = row.get("feedback");

    Ok(Interview {
        id: parse_uuid(row.get("id"))?,
        candidate_name: row.get("candidate_name"),
        candidate_email: row.get("candidate_email"),
        application_id: application_id.as_deref().map(parse_uuid).transpose()?,
        status,
        started_at: parse_timestamp(&started_at)?,
        ended_at: ended_at.as_deref().map(parse_timestamp).transpose()?,
        total_score: row.get("total_score"),
        feedback: feedback_raw.and_then(|s| serde_json::from_str::<Feedback>(&s).ok()),
        current_question_id: current_question_id.as_deref().map(parse_uuid).transpose()?,
    })
}

/// Insert a new interview in `in_progress`
pub async fn insert_interview(
    pool: &SqlitePool,
    candidate_name: &str,
    candidate_email: &str,
    application_id: Option<Uuid>,
    started_at: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO interview (id, candidate_name, candidate_email, application_id, status, started_at)
        VALUES (?, ?, ?, ?, 'in_progress', ?)
        "#,
    )
    .bind(id.to_string())
    .bind(candidate_name)
    .bind(candidate_email)
    .bind(application_id.map(|a| a.to_string()))
    .bind(started_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(id)
}

/// Load one interview; `NotFound` if the id is unknown
pub async fn get_interview(pool: &SqlitePool, id: Uuid) -> Result<Interview> {
    let row = sqlx::query("SELECT * FROM interview WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Interview not found: {}", id)))?;

    interview_from_row(&row)
}

/// Update the current-question pointer after a question is generated
pub async fn set_current_question(
    pool: &SqlitePool,
    interview_id: Uuid,
    question_id: Uuid,
) -> Result<()> {
    sqlx::query("UPDATE interview SET current_question_id = ? WHERE id = ?")
        .bind(question_id.to_string())
        .bind(interview_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Transition an interview to `completed`, stamping `ended_at`.
/// `NotFound` if the id is unknown.
pub async fn mark_completed(
    pool: &SqlitePool,
    interview_id: Uuid,
    ended_at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query("UPDATE interview SET status = 'completed', ended_at = ? WHERE id = ?")
        .bind(ended_at.to_rfc3339())
        .bind(interview_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "Interview not found: {}",
            interview_id
        )));
    }
    Ok(())
}

/// Persist the overall assessment. Last write wins; a recompute overwrites
/// whatever a late evaluation stored earlier.
pub async fn store_feedback(
    pool: &SqlitePool,
    interview_id: Uuid,
    total_score: f64,
    feedback: &Feedback,
) -> Result<()> {
    let feedback_json = serde_json::to_string(feedback)
        .map_err(|e| Error::Internal(format!("Failed to serialize feedback: {}", e)))?;

    sqlx::query("UPDATE interview SET total_score = ?, feedback = ? WHERE id = ?")
        .bind(total_score)
        .bind(feedback_json)
        .bind(interview_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Recent interviews with their question counts, newest first
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<(Interview, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT i.*, (SELECT COUNT(*) FROM question q WHERE q.interview_id = i.id) AS question_count
        FROM interview i
        ORDER BY i.started_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut interviews = Vec::with_capacity(rows.len());
    for row in &rows {
        let count: i64 = row.get("question_count");
        interviews.push((interview_from_row(row)?, count));
    }
    Ok(interviews)
}

/// Per-interview (score sum, answer count) pairs across completed
/// interviews, for the dashboard rollup. The CAST keeps the sum REAL even
/// when the interview has no scored answers and SUM collapses to the
/// integer 0.
pub async fn completed_score_rows(pool: &SqlitePool) -> Result<Vec<(f64, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT
            CAST((SELECT COALESCE(SUM(score), 0) FROM answer a WHERE a.interview_id = i.id) AS REAL) AS score_sum,
            (SELECT COUNT(*) FROM answer a WHERE a.interview_id = i.id) AS answer_count
        FROM interview i
        WHERE i.status = 'completed'
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut pairs = Vec::with_capacity(rows.len());
    for row in &rows {
        pairs.push((row.try_get("score_sum")?, row.try_get("answer_count")?));
    }
    Ok(pairs)
}

/// Count of completed interviews
pub async fn completed_count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interview WHERE status = 'completed'")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Advance the linked application to `interviewed` and return its candidate
/// identity when one is stored. The applications table is administered
/// elsewhere; a missing row is not an error here.
pub async fn mark_application_interviewed(
    pool: &SqlitePool,
    application_id: Uuid,
) -> Result<Option<(String, String)>> {
    sqlx::query("UPDATE applications SET status = 'interviewed' WHERE id = ?")
        .bind(application_id.to_string())
        .execute(pool)
        .await?;

    let row = sqlx::query("SELECT candidate_name, candidate_email FROM applications WHERE id = ?")
        .bind(application_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| (r.get("candidate_name"), r.get("candidate_email"))))
}
