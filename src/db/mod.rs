//! Database access for hireflow
//!
//! SQLite via sqlx. IDs are UUIDs stored as TEXT; timestamps are RFC 3339
//! TEXT. Schema is created on pool init so a fresh data folder is usable
//! without a separate migration step.

pub mod answers;
pub mod interviews;
pub mod proctor;
pub mod questions;
pub mod tasks;
pub mod transcripts;

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

/// Initialize database connection pool, creating the file and schema if
/// missing
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables and indexes if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            candidate_name TEXT NOT NULL,
            candidate_email TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interview (
            id TEXT PRIMARY KEY,
            candidate_name TEXT NOT NULL,
            candidate_email TEXT NOT NULL,
            application_id TEXT,
            status TEXT NOT NULL DEFAULT 'in_progress',
            started_at TEXT NOT NULL,
            ended_at TEXT,
            total_score REAL,
            feedback TEXT,
            current_question_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS question (
            id TEXT PRIMARY KEY,
            interview_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            text TEXT NOT NULL,
            source_tag TEXT NOT NULL,
            asked_at TEXT NOT NULL,
            UNIQUE(interview_id, seq),
            FOREIGN KEY(interview_id) REFERENCES interview(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // UNIQUE(question_id) is what makes the two answer arrival paths
    // converge on one row; both paths upsert against it.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answer (
            id TEXT PRIMARY KEY,
            question_id TEXT NOT NULL UNIQUE,
            interview_id TEXT NOT NULL,
            recording_path TEXT,
            cropped_recording_path TEXT,
            start_time TEXT,
            end_time TEXT,
            duration_seconds REAL,
            score REAL,
            verdict TEXT,
            strengths TEXT NOT NULL DEFAULT '[]',
            weaknesses TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY(question_id) REFERENCES question(id),
            FOREIGN KEY(interview_id) REFERENCES interview(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcript_chunk (
            id TEXT PRIMARY KEY,
            answer_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            text TEXT NOT NULL,
            is_final INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(answer_id) REFERENCES answer(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS proctor_event (
            id TEXT PRIMARY KEY,
            interview_id TEXT NOT NULL,
            question_id TEXT,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            confidence REAL NOT NULL,
            frame_path TEXT,
            notes TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(interview_id) REFERENCES interview(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS eval_task (
            id TEXT PRIMARY KEY,
            interview_id TEXT NOT NULL,
            answer_id TEXT,
            kind TEXT NOT NULL,
            attempt INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_question_interview ON question(interview_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_answer_interview ON answer(interview_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunk_answer ON transcript_chunk(answer_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_proctor_interview ON proctor_event(interview_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_status ON eval_task(status)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}

/// Parse a TEXT column back into a Uuid
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))
}

/// Parse an RFC 3339 TEXT column back into a UTC timestamp
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp in database: {}", e)))
}

/// Deserialize a JSON list column, tolerating NULL and malformed content
pub(crate) fn parse_string_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}
