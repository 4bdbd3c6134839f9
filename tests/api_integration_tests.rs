//! Integration tests for the HTTP surface

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::util::ServiceExt;

use helpers::{body_json, get, post_empty, post_json, test_app, MockBackend};

#[tokio::test]
async fn health_endpoint_reports_service_identity() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "hireflow");
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn create_interview_returns_id() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .oneshot(post_json(
            "/api/interviews",
            serde_json::json!({
                "candidate_name": "Jordan Reyes",
                "candidate_email": "jordan@example.com"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["interview_id"].is_string());
    assert!(json["application_id"].is_null());
}

#[tokio::test]
async fn unknown_interview_is_404() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .oneshot(get(
            "/api/interviews/00000000-0000-0000-0000-000000000000",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn question_generation_sequences_from_one() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    for expected_seq in 1..=3 {
        let response = app
            .clone()
            .oneshot(post_empty(&format!(
                "/api/interviews/{}/questions/generate",
                interview_id
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["question"]["seq"], expected_seq);
        assert_eq!(json["question"]["total_questions"], 5);
        assert!(json["question"]["text"].as_str().unwrap().len() > 0);
    }
}

#[tokio::test]
async fn question_kinds_follow_configured_policy() {
    // for_tests config: 2 resume, 2 technical, 1 hr
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let expected = ["resume", "resume", "technical", "technical", "hr", "hr"];
    for kind in expected {
        let response = app
            .clone()
            .oneshot(post_empty(&format!(
                "/api/interviews/{}/questions/generate",
                interview_id
            )))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["question"]["question_type"], kind);
    }
}

#[tokio::test]
async fn transcript_before_any_question_is_conflict() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(post_json(
            &format!("/api/interviews/{}/transcript", interview_id),
            serde_json::json!({ "text": "hello there", "is_final": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NO_ACTIVE_QUESTION");
}

#[tokio::test]
async fn transcript_after_question_targets_current_question() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    app.clone()
        .oneshot(post_empty(&format!(
            "/api/interviews/{}/questions/generate",
            interview_id
        )))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            &format!("/api/interviews/{}/transcript", interview_id),
            serde_json::json!({ "text": "I sold enterprise plans", "is_final": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["answer_id"].is_string());
}

#[tokio::test]
async fn upload_with_garbage_timestamp_is_400() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(post_empty(&format!(
            "/api/interviews/{}/questions/generate",
            interview_id
        )))
        .await
        .unwrap();
    let question_id = body_json(response).await["question"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let boundary = "----hireflowtest";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"a.webm\"\r\n\
         Content-Type: video/webm\r\n\r\n\
         fake-video-bytes\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"start_time\"\r\n\r\n\
         not-a-timestamp\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"end_time\"\r\n\r\n\
         2026-01-01T00:00:30Z\r\n\
         --{boundary}--\r\n"
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!(
                    "/api/interviews/{}/answers/{}/upload",
                    interview_id, question_id
                ))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn upload_resolves_to_same_answer_as_transcript() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(post_empty(&format!(
            "/api/interviews/{}/questions/generate",
            interview_id
        )))
        .await
        .unwrap();
    let question_id = body_json(response).await["question"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Transcript path creates the answer row first
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/interviews/{}/transcript", interview_id),
            serde_json::json!({ "text": "I exceeded quota every quarter", "is_final": true }),
        ))
        .await
        .unwrap();
    let transcript_answer_id = body_json(response).await["answer_id"]
        .as_str()
        .unwrap()
        .to_string();

    let boundary = "----hireflowtest";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"a.webm\"\r\n\
         Content-Type: video/webm\r\n\r\n\
         fake-video-bytes\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"start_time\"\r\n\r\n\
         2026-01-01T00:00:00Z\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"end_time\"\r\n\r\n\
         2026-01-01T00:00:30Z\r\n\
         --{boundary}--\r\n"
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!(
                    "/api/interviews/{}/answers/{}/upload",
                    interview_id, question_id
                ))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["answer_id"].as_str().unwrap(), transcript_answer_id);
}

#[tokio::test]
async fn interview_detail_includes_questions_and_answers() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/interviews",
            serde_json::json!({ "candidate_name": "Sam Oduya" }),
        ))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    app.clone()
        .oneshot(post_empty(&format!(
            "/api/interviews/{}/questions/generate",
            interview_id
        )))
        .await
        .unwrap();

    let response = app
        .oneshot(get(&format!("/api/interviews/{}", interview_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["candidate_name"], "Sam Oduya");
    assert_eq!(json["status"], "in_progress");
    assert_eq!(json["questions"].as_array().unwrap().len(), 1);
    assert!(json["questions"][0]["answer"].is_null());
}

#[tokio::test]
async fn recent_interviews_lists_newest_with_question_counts() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    app.clone()
        .oneshot(post_empty(&format!(
            "/api/interviews/{}/questions/generate",
            interview_id
        )))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/interviews/recent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let interviews = json["interviews"].as_array().unwrap();
    assert_eq!(interviews.len(), 1);
    assert_eq!(interviews[0]["id"].as_str().unwrap(), interview_id);
    assert_eq!(interviews[0]["question_count"], 1);
}

#[tokio::test]
async fn proctor_event_without_frame_is_recorded() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(post_json(
            &format!("/api/interviews/{}/proctor/event", interview_id),
            serde_json::json!({
                "event_type": "no_face",
                "confidence": 1.0,
                "notes": "Client detected empty frame"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["event_id"].is_string());
}

#[tokio::test]
async fn proctor_confidence_is_clamped() {
    let (app, state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(post_json(
            &format!("/api/interviews/{}/proctor/event", interview_id),
            serde_json::json!({ "event_type": "multi_face", "confidence": 7.5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let interview_uuid = interview_id.parse().unwrap();
    let events = hireflow::db::proctor::list_for_interview(&state.db, interview_uuid)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].confidence, 1.0);
}

#[tokio::test]
async fn metrics_survive_a_zero_answer_completion() {
    let (app, state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_id = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(post_empty(&format!(
            "/api/interviews/{}/complete",
            interview_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    hireflow::services::task_worker::drain(&state).await.unwrap();

    let response = app.oneshot(get("/api/metrics/overview")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["completedAssessments"], 1);
    assert_eq!(json["avgScore"], 0.0);
    assert_eq!(json["pendingTasks"], 0);
}

#[tokio::test]
async fn rejected_upload_leaves_no_recording_behind() {
    let (app, state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    // Question belongs to interview B; the upload targets it via interview A
    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_a = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(post_json("/api/interviews", serde_json::json!({})))
        .await
        .unwrap();
    let interview_b = body_json(response).await["interview_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(post_empty(&format!(
            "/api/interviews/{}/questions/generate",
            interview_b
        )))
        .await
        .unwrap();
    let question_b = body_json(response).await["question"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let boundary = "----hireflowtest";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"a.webm\"\r\n\
         Content-Type: video/webm\r\n\r\n\
         fake-video-bytes\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"start_time\"\r\n\r\n\
         2026-01-01T00:00:00Z\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"end_time\"\r\n\r\n\
         2026-01-01T00:00:30Z\r\n\
         --{boundary}--\r\n"
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!(
                    "/api/interviews/{}/answers/{}/upload",
                    interview_a, question_b
                ))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let recording_path = state
        .config
        .media_dir()
        .join(format!("{}_{}.webm", interview_a, question_b));
    assert!(!recording_path.exists());
}

#[tokio::test]
async fn metrics_overview_starts_empty() {
    let (app, _state, _dir) = test_app(Arc::new(MockBackend::default())).await;

    let response = app.oneshot(get("/api/metrics/overview")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["completedAssessments"], 0);
    assert_eq!(json["avgScore"], 0.0);
    assert_eq!(json["pendingTasks"], 0);
}
