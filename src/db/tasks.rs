//! Persisted background-task queue
//!
//! Every piece of deferred work (answer evaluation, interview finalize) is a
//! row here until acknowledged, so pending work survives restarts and a
//! recompute never has to re-derive what still needs evaluation. Claiming
//! marks the row `running` and bumps `attempt` in one statement; the single
//! worker drains in creation order.

use crate::db::{parse_timestamp, parse_uuid};
use crate::error::{Error, Result};
use crate::models::{EvalTask, TaskKind};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Enqueue one task
pub async fn enqueue(
    pool: &SqlitePool,
    interview_id: Uuid,
    answer_id: Option<Uuid>,
    kind: TaskKind,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO eval_task (id, interview_id, answer_id, kind, status, created_at)
        VALUES (?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(id.to_string())
    .bind(interview_id.to_string())
    .bind(answer_id.map(|a| a.to_string()))
    .bind(kind.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(id)
}

/// Claim the oldest pending task, marking it running
pub async fn claim_next(pool: &SqlitePool) -> Result<Option<EvalTask>> {
    let row = sqlx::query(
        r#"
        UPDATE eval_task
        SET status = 'running', attempt = attempt + 1
        WHERE id = (
            SELECT id FROM eval_task WHERE status = 'pending'
            ORDER BY created_at LIMIT 1
        )
        RETURNING id, interview_id, answer_id, kind, attempt, created_at
        "#,
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let kind_raw: String = row.get("kind");
    let answer_id: Option<String> = row.get("answer_id");
    let created_at: String = row.get("created_at");

    Ok(Some(EvalTask {
        id: parse_uuid(row.get("id"))?,
        interview_id: parse_uuid(row.get("interview_id"))?,
        answer_id: answer_id.as_deref().map(parse_uuid).transpose()?,
        kind: TaskKind::parse(&kind_raw)
            .ok_or_else(|| Error::Internal(format!("Unknown task kind: {}", kind_raw)))?,
        attempt: row.get("attempt"),
        created_at: parse_timestamp(&created_at)?,
    }))
}

/// Acknowledge a finished task
pub async fn mark_done(pool: &SqlitePool, task_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE eval_task SET status = 'done', completed_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(task_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a task failure. Failed tasks are not retried automatically; an
/// explicit recompute enqueues fresh work instead.
pub async fn mark_failed(pool: &SqlitePool, task_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE eval_task SET status = 'failed', completed_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(task_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Number of tasks not yet acknowledged
pub async fn pending_count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM eval_task WHERE status IN ('pending', 'running')",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}
