//! Transcript chunk table operations. Append-only.

use crate::db::{parse_timestamp, parse_uuid};
use crate::error::Result;
use crate::models::TranscriptChunk;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Append one chunk to an answer's transcript
pub async fn append_chunk(
    pool: &SqlitePool,
    answer_id: Uuid,
    timestamp: DateTime<Utc>,
    text: &str,
    is_final: bool,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO transcript_chunk (id, answer_id, timestamp, text, is_final)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(answer_id.to_string())
    .bind(timestamp.to_rfc3339())
    .bind(text)
    .bind(is_final)
    .execute(pool)
    .await?;

    Ok(id)
}

/// All chunks of an answer in timestamp order, interim ones included
pub async fn list_for_answer(pool: &SqlitePool, answer_id: Uuid) -> Result<Vec<TranscriptChunk>> {
    let rows = sqlx::query(
        "SELECT * FROM transcript_chunk WHERE answer_id = ? ORDER BY timestamp",
    )
    .bind(answer_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut chunks = Vec::with_capacity(rows.len());
    for row in &rows {
        let timestamp: String = row.get("timestamp");
        let is_final: i64 = row.get("is_final");
        chunks.push(TranscriptChunk {
            id: parse_uuid(row.get("id"))?,
            answer_id: parse_uuid(row.get("answer_id"))?,
            timestamp: parse_timestamp(&timestamp)?,
            text: row.get("text"),
            is_final: is_final != 0,
        });
    }
    Ok(chunks)
}

/// The answer's evaluated text: all final chunks in timestamp order,
/// joined with spaces
pub async fn final_text(pool: &SqlitePool, answer_id: Uuid) -> Result<String> {
    let texts: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT text FROM transcript_chunk
        WHERE answer_id = ? AND is_final = 1
        ORDER BY timestamp
        "#,
    )
    .bind(answer_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(texts.join(" "))
}
