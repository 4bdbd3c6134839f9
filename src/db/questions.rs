//! Question table operations

use crate::db::{parse_timestamp, parse_uuid};
use crate::error::{Error, Result};
use crate::models::{Question, QuestionKind};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn question_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question> {
    let source_raw: String = row.get("source_tag");
    let asked_at: String = row.get("asked_at");

    Ok(Question {
        id: parse_uuid(row.get("id"))?,
        interview_id: parse_uuid(row.get("interview_id"))?,
        seq: row.get("seq"),
        text: row.get("text"),
        source_tag: QuestionKind::parse(&source_raw)
            .ok_or_else(|| Error::Internal(format!("Unknown question source: {}", source_raw)))?,
        asked_at: parse_timestamp(&asked_at)?,
    })
}

/// Number of questions asked so far in an interview
pub async fn count_for_interview(pool: &SqlitePool, interview_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM question WHERE interview_id = ?")
        .bind(interview_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Insert a question at the given sequence position. The UNIQUE
/// (interview_id, seq) constraint rejects duplicate sequence numbers; the
/// caller serializes allocation per interview so this does not fire in
/// normal operation.
pub async fn insert_question(
    pool: &SqlitePool,
    interview_id: Uuid,
    seq: i64,
    text: &str,
    source_tag: QuestionKind,
    asked_at: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO question (id, interview_id, seq, text, source_tag, asked_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(interview_id.to_string())
    .bind(seq)
    .bind(text)
    .bind(source_tag.as_str())
    .bind(asked_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(id)
}

/// Load one question; `NotFound` if unknown
pub async fn get_question(pool: &SqlitePool, id: Uuid) -> Result<Question> {
    let row = sqlx::query("SELECT * FROM question WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Question not found: {}", id)))?;

    question_from_row(&row)
}

/// All questions of an interview in sequence order
pub async fn list_for_interview(pool: &SqlitePool, interview_id: Uuid) -> Result<Vec<Question>> {
    let rows = sqlx::query("SELECT * FROM question WHERE interview_id = ? ORDER BY seq")
        .bind(interview_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(question_from_row).collect()
}
