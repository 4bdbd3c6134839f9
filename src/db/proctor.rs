//! Proctor event table operations. Append-only audit log.

use crate::db::{parse_timestamp, parse_uuid};
use crate::error::Result;
use crate::models::ProctorEvent;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Record one proctoring observation
#[allow(clippy::too_many_arguments)]
pub async fn insert_event(
    pool: &SqlitePool,
    interview_id: Uuid,
    question_id: Option<Uuid>,
    timestamp: DateTime<Utc>,
    event_type: &str,
    confidence: f64,
    frame_path: Option<&str>,
    notes: &str,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO proctor_event (id, interview_id, question_id, timestamp, event_type, confidence, frame_path, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(interview_id.to_string())
    .bind(question_id.map(|q| q.to_string()))
    .bind(timestamp.to_rfc3339())
    .bind(event_type)
    .bind(confidence)
    .bind(frame_path)
    .bind(notes)
    .execute(pool)
    .await?;

    Ok(id)
}

/// All events of an interview in time order
pub async fn list_for_interview(pool: &SqlitePool, interview_id: Uuid) -> Result<Vec<ProctorEvent>> {
    let rows = sqlx::query("SELECT * FROM proctor_event WHERE interview_id = ? ORDER BY timestamp")
        .bind(interview_id.to_string())
        .fetch_all(pool)
        .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in &rows {
        let timestamp: String = row.get("timestamp");
        let question_id: Option<String> = row.get("question_id");
        events.push(ProctorEvent {
            id: parse_uuid(row.get("id"))?,
            interview_id: parse_uuid(row.get("interview_id"))?,
            question_id: question_id.as_deref().map(parse_uuid).transpose()?,
            timestamp: parse_timestamp(&timestamp)?,
            event_type: row.get("event_type"),
            confidence: row.get("confidence"),
            frame_path: row.get("frame_path"),
            notes: row.get("notes"),
        });
    }
    Ok(events)
}
