//! Background task worker
//!
//! Single drain loop over the persisted queue. Work is claimed one entry
//! at a time so per-answer evaluation and interview finalize never race
//! each other. A task failure is recorded and the loop moves on; retries
//! happen only through an explicit recompute.

use crate::db;
use crate::error::{Error, Result};
use crate::models::{EvalTask, TaskKind};
use crate::services::evaluator;
use crate::AppState;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Interval for polling the queue when no notification arrives
const IDLE_POLL: Duration = Duration::from_secs(1);

/// Spawn the worker loop. Runs for the life of the process.
pub fn spawn(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Background task worker started");
        loop {
            match db::tasks::claim_next(&state.db).await {
                Ok(Some(task)) => {
                    let task_id = task.id;
                    match run_task(&state, &task).await {
                        Ok(()) => {
                            if let Err(e) = db::tasks::mark_done(&state.db, task_id).await {
                                error!(task_id = %task_id, "Failed to acknowledge task: {}", e);
                            }
                        }
                        Err(e) => {
                            error!(
                                task_id = %task_id,
                                kind = task.kind.as_str(),
                                attempt = task.attempt,
                                "Background task failed: {}",
                                e
                            );
                            let _ = db::tasks::mark_failed(&state.db, task_id).await;
                            state.set_last_error(e.to_string()).await;
                        }
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        _ = state.task_notify.notified() => {
                            debug!("Task worker woken by notification");
                        }
                        _ = tokio::time::sleep(IDLE_POLL) => {}
                    }
                }
                Err(e) => {
                    error!("Task claim failed: {}", e);
                    tokio::time::sleep(IDLE_POLL).await;
                }
            }
        }
    })
}

async fn run_task(state: &AppState, task: &EvalTask) -> Result<()> {
    match task.kind {
        TaskKind::EvaluateAnswer => {
            let answer_id = task.answer_id.ok_or_else(|| {
                Error::Internal(format!("Evaluate task {} has no answer id", task.id))
            })?;
            evaluator::evaluate_answer(state, answer_id).await?;
            Ok(())
        }
        TaskKind::FinalizeInterview => {
            evaluator::finalize_interview(state, task.interview_id).await?;
            Ok(())
        }
    }
}

/// Drain the queue until empty. Test-facing: lets integration tests run
/// queued work deterministically instead of racing the spawned loop.
pub async fn drain(state: &AppState) -> Result<usize> {
    let mut processed = 0;
    while let Some(task) = db::tasks::claim_next(&state.db).await? {
        match run_task(state, &task).await {
            Ok(()) => db::tasks::mark_done(&state.db, task.id).await?,
            Err(e) => {
                error!(task_id = %task.id, "Background task failed: {}", e);
                db::tasks::mark_failed(&state.db, task.id).await?;
            }
        }
        processed += 1;
    }
    Ok(processed)
}
