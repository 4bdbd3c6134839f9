//! End-to-end pipeline tests driven at the service layer
//!
//! These exercise the reconciler, the persisted task queue, and the
//! evaluation orchestrator directly against an in-memory database, with
//! the model backend scripted per test.

mod helpers;

use chrono::Utc;
use std::sync::Arc;

use helpers::{test_state, MockBackend};
use hireflow::db;
use hireflow::models::{InterviewStatus, TaskKind};
use hireflow::services::{evaluator, reconciler, session, task_worker};
use hireflow::AppState;

async fn ask_and_answer(state: &AppState, interview_id: uuid::Uuid, text: &str) -> uuid::Uuid {
    session::next_question(state, interview_id, Default::default())
        .await
        .unwrap();
    let answer_id = reconciler::on_transcript_chunk(state, interview_id, text, Utc::now(), true)
        .await
        .unwrap();
    db::tasks::enqueue(&state.db, interview_id, Some(answer_id), TaskKind::EvaluateAnswer)
        .await
        .unwrap();
    answer_id
}

#[tokio::test]
async fn five_answer_interview_totals_eighteen_of_twentyfive() {
    let backend = MockBackend::with_scores(&[
        &MockBackend::scoring(4.0),
        &MockBackend::scoring(3.0),
        &MockBackend::scoring(5.0),
        &MockBackend::scoring(2.0),
        &MockBackend::scoring(4.0),
    ]);
    let (state, _dir) = test_state(Arc::new(backend)).await;

    let interview = session::start_interview(&state, "Test Candidate", "t@example.com", None)
        .await
        .unwrap();

    for i in 0..5 {
        ask_and_answer(&state, interview.id, &format!("A substantial answer number {}", i)).await;
    }
    task_worker::drain(&state).await.unwrap();

    session::complete(&state, interview.id).await.unwrap();
    task_worker::drain(&state).await.unwrap();

    let interview = db::interviews::get_interview(&state.db, interview.id)
        .await
        .unwrap();
    assert_eq!(interview.status, InterviewStatus::Completed);
    assert!(interview.ended_at.is_some());
    assert_eq!(interview.total_score, Some(18.0));

    let feedback = interview.feedback.unwrap();
    assert_eq!(feedback.overall_score, 18.0);
    assert_eq!(feedback.overall_score_percent, 72.0);
    assert_eq!(feedback.suitability_score, 75.0);
    assert!(!feedback.topics.is_empty());
}

#[tokio::test]
async fn transcript_and_upload_merge_into_one_answer() {
    let (state, dir) = test_state(Arc::new(MockBackend::default())).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();
    let question = session::next_question(&state, interview.id, Default::default())
        .await
        .unwrap();

    // Transcript arrives first
    let transcript_answer =
        reconciler::on_transcript_chunk(&state, interview.id, "part one", Utc::now(), true)
            .await
            .unwrap();

    // Upload for the same question lands on the same row
    let recording = dir.path().join("media").join("recording.webm");
    tokio::fs::write(&recording, b"fake").await.unwrap();
    let start = Utc::now();
    let end = start + chrono::Duration::seconds(42);
    let upload_answer = reconciler::on_video_uploaded(
        &state,
        interview.id,
        question.id,
        recording.clone(),
        start,
        end,
    )
    .await
    .unwrap();

    assert_eq!(transcript_answer, upload_answer);

    let answer = db::answers::get_answer(&state.db, upload_answer).await.unwrap();
    assert_eq!(answer.question_id, question.id);
    assert_eq!(
        answer.recording_path.as_deref(),
        Some(recording.to_string_lossy().as_ref())
    );
    assert_eq!(answer.duration_seconds, Some(42.0));

    // Transcript text survives the merge
    let text = db::transcripts::final_text(&state.db, upload_answer)
        .await
        .unwrap();
    assert_eq!(text, "part one");
}

#[tokio::test]
async fn upload_first_then_transcript_is_the_same_row() {
    let (state, dir) = test_state(Arc::new(MockBackend::default())).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();
    let question = session::next_question(&state, interview.id, Default::default())
        .await
        .unwrap();

    let recording = dir.path().join("media").join("recording.webm");
    tokio::fs::write(&recording, b"fake").await.unwrap();
    let start = Utc::now();
    let upload_answer = reconciler::on_video_uploaded(
        &state,
        interview.id,
        question.id,
        recording,
        start,
        start + chrono::Duration::seconds(10),
    )
    .await
    .unwrap();

    let transcript_answer =
        reconciler::on_transcript_chunk(&state, interview.id, "late chunk", Utc::now(), true)
            .await
            .unwrap();

    assert_eq!(upload_answer, transcript_answer);

    // Upload-provided start time is not overwritten by the transcript path
    let answer = db::answers::get_answer(&state.db, upload_answer).await.unwrap();
    assert_eq!(answer.start_time, Some(start));
}

#[tokio::test]
async fn upload_for_foreign_question_is_rejected() {
    let (state, dir) = test_state(Arc::new(MockBackend::default())).await;

    let interview_a = session::start_interview(&state, "", "", None).await.unwrap();
    let interview_b = session::start_interview(&state, "", "", None).await.unwrap();
    let question_b = session::next_question(&state, interview_b.id, Default::default())
        .await
        .unwrap();

    let recording = dir.path().join("media").join("recording.webm");
    tokio::fs::write(&recording, b"fake").await.unwrap();
    let result = reconciler::on_video_uploaded(
        &state,
        interview_a.id,
        question_b.id,
        recording,
        Utc::now(),
        Utc::now(),
    )
    .await;

    assert!(matches!(result, Err(hireflow::Error::NotFound(_))));
}

#[tokio::test]
async fn unparsable_model_reply_only_zeroes_that_answer() {
    let backend = MockBackend::with_scores(&[
        &MockBackend::scoring(4.0),
        "I am sorry, I cannot help with that.",
        &MockBackend::scoring(4.0),
    ]);
    let (state, _dir) = test_state(Arc::new(backend)).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();
    let mut answer_ids = Vec::new();
    for i in 0..3 {
        answer_ids.push(ask_and_answer(&state, interview.id, &format!("Long answer {}", i)).await);
    }
    task_worker::drain(&state).await.unwrap();

    let first = db::answers::get_answer(&state.db, answer_ids[0]).await.unwrap();
    let second = db::answers::get_answer(&state.db, answer_ids[1]).await.unwrap();
    let third = db::answers::get_answer(&state.db, answer_ids[2]).await.unwrap();

    assert_eq!(first.score, Some(4.0));
    assert_eq!(second.score, Some(0.0));
    assert!(second.verdict.unwrap().contains("Unable to evaluate"));
    assert_eq!(third.score, Some(4.0));
}

#[tokio::test]
async fn short_answers_are_skipped_not_failed() {
    let (state, _dir) = test_state(Arc::new(MockBackend::default())).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();
    session::next_question(&state, interview.id, Default::default())
        .await
        .unwrap();
    let answer_id = reconciler::on_transcript_chunk(&state, interview.id, "ok", Utc::now(), true)
        .await
        .unwrap();

    let result = evaluator::evaluate_answer(&state, answer_id).await.unwrap();
    assert!(result.is_none());

    let answer = db::answers::get_answer(&state.db, answer_id).await.unwrap();
    assert_eq!(answer.score, None);
}

#[tokio::test]
async fn interim_chunks_are_excluded_from_the_answer_text() {
    let (state, _dir) = test_state(Arc::new(MockBackend::default())).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();
    session::next_question(&state, interview.id, Default::default())
        .await
        .unwrap();

    let answer_id =
        reconciler::on_transcript_chunk(&state, interview.id, "I was", Utc::now(), false)
            .await
            .unwrap();
    reconciler::on_transcript_chunk(&state, interview.id, "I was the top", Utc::now(), false)
        .await
        .unwrap();
    reconciler::on_transcript_chunk(
        &state,
        interview.id,
        "I was the top performer",
        Utc::now(),
        true,
    )
    .await
    .unwrap();

    let text = db::transcripts::final_text(&state.db, answer_id).await.unwrap();
    assert_eq!(text, "I was the top performer");

    // The full chunk history keeps the interim entries
    let chunks = db::transcripts::list_for_answer(&state.db, answer_id)
        .await
        .unwrap();
    assert_eq!(chunks.len(), 3);
    assert_eq!(
        chunks.iter().filter(|c| c.is_final).count(),
        1,
        "exactly one final chunk"
    );
    assert_eq!(chunks[0].text, "I was");
}

#[tokio::test]
async fn concurrent_question_generation_is_gapless() {
    let (state, _dir) = test_state(Arc::new(MockBackend::default())).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let state = state.clone();
        let interview_id = interview.id;
        handles.push(tokio::spawn(async move {
            session::next_question(&state, interview_id, Default::default())
                .await
                .unwrap()
                .seq
        }));
    }

    let mut seqs = Vec::new();
    for handle in handles {
        seqs.push(handle.await.unwrap());
    }
    seqs.sort_unstable();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);

    let questions = db::questions::list_for_interview(&state.db, interview.id)
        .await
        .unwrap();
    assert_eq!(questions.len(), 5);
}

#[tokio::test]
async fn completing_with_zero_answers_yields_zero_score() {
    let (state, _dir) = test_state(Arc::new(MockBackend::default())).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();
    session::complete(&state, interview.id).await.unwrap();
    task_worker::drain(&state).await.unwrap();

    let interview = db::interviews::get_interview(&state.db, interview.id)
        .await
        .unwrap();
    assert_eq!(interview.status, InterviewStatus::Completed);
    assert_eq!(interview.total_score, Some(0.0));

    let feedback = interview.feedback.unwrap();
    assert_eq!(feedback.overall_score, 0.0);
    assert_eq!(feedback.overall_score_percent, 0.0);
    assert!(feedback.topics.is_empty());
}

#[tokio::test]
async fn completing_an_unknown_interview_is_not_found() {
    let (state, _dir) = test_state(Arc::new(MockBackend::default())).await;

    let result = session::complete(&state, uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(hireflow::Error::NotFound(_))));
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let backend = MockBackend::with_scores(&[&MockBackend::scoring(3.0)]);
    let (state, _dir) = test_state(Arc::new(backend)).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();
    for i in 0..2 {
        ask_and_answer(&state, interview.id, &format!("Detailed answer {}", i)).await;
    }
    task_worker::drain(&state).await.unwrap();
    session::complete(&state, interview.id).await.unwrap();
    task_worker::drain(&state).await.unwrap();

    let first = evaluator::recompute_interview(&state, interview.id).await.unwrap();
    let second = evaluator::recompute_interview(&state, interview.id).await.unwrap();

    assert_eq!(first.overall_score, 6.0);
    assert_eq!(second.overall_score, 6.0);
    assert_eq!(first.overall_score_percent, second.overall_score_percent);

    // Still exactly one answer row per question
    let answers = db::answers::list_for_interview(&state.db, interview.id)
        .await
        .unwrap();
    assert_eq!(answers.len(), 2);
}

#[tokio::test]
async fn failed_tasks_record_an_attempt_and_do_not_block_the_queue() {
    let (state, _dir) = test_state(Arc::new(MockBackend::default())).await;

    let interview = session::start_interview(&state, "", "", None).await.unwrap();

    // Evaluate task pointing at a deleted answer fails; the finalize task
    // behind it still runs.
    db::tasks::enqueue(
        &state.db,
        interview.id,
        Some(uuid::Uuid::new_v4()),
        TaskKind::EvaluateAnswer,
    )
    .await
    .unwrap();
    db::tasks::enqueue(&state.db, interview.id, None, TaskKind::FinalizeInterview)
        .await
        .unwrap();

    let processed = task_worker::drain(&state).await.unwrap();
    assert_eq!(processed, 2);
    assert_eq!(db::tasks::pending_count(&state.db).await.unwrap(), 0);

    let interview = db::interviews::get_interview(&state.db, interview.id)
        .await
        .unwrap();
    assert!(interview.feedback.is_some());
}

#[tokio::test]
async fn application_reference_supplies_candidate_identity() {
    let (state, _dir) = test_state(Arc::new(MockBackend::default())).await;

    let app_id = uuid::Uuid::new_v4();
    sqlx::query(
        "INSERT INTO applications (id, candidate_name, candidate_email, status) VALUES (?, ?, ?, 'pending')",
    )
    .bind(app_id.to_string())
    .bind("Ada Okafor")
    .bind("ada@example.com")
    .execute(&state.db)
    .await
    .unwrap();

    let interview = session::start_interview(&state, "", "", Some(app_id)).await.unwrap();
    assert_eq!(interview.candidate_name, "Ada Okafor");
    assert_eq!(interview.candidate_email, "ada@example.com");
    assert_eq!(interview.application_id, Some(app_id));

    let status: String = sqlx::query_scalar("SELECT status FROM applications WHERE id = ?")
        .bind(app_id.to_string())
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(status, "interviewed");
}
