//! Shared test helpers: in-memory state and a scripted model backend

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use hireflow::config::Config;
use hireflow::events::EventBus;
use hireflow::services::scoring_gateway::GatewayError;
use hireflow::services::{
    BlockFaceDetector, FrameAnalyzer, GenerativeBackend, ScoringGateway,
};
use hireflow::AppState;

/// Scripted backend routed by prompt content. Scoring prompts pop from the
/// queue (last entry repeats); other prompt kinds return fixed payloads.
pub struct MockBackend {
    score_responses: Mutex<VecDeque<String>>,
    topics_response: String,
    feedback_response: String,
    question_text: String,
}

impl Default for MockBackend {
    fn default() -> Self {
        MockBackend {
            score_responses: Mutex::new(VecDeque::new()),
            topics_response: r#"{"topics": [{"topic": "SALES SKILLS", "score": 4.0, "max": 5}]}"#
                .to_string(),
            feedback_response: r#"{
                "overall_feedback": "A capable candidate.",
                "detailed_feedback": "Communicates clearly and answers directly.",
                "key_strengths": ["clarity"],
                "areas_for_improvement": ["depth"],
                "confidence_level": "High",
                "communication_quality": "Good",
                "suitability_score": 75
            }"#
            .to_string(),
            question_text: "Walk me through a recent sale you closed.".to_string(),
        }
    }
}

impl MockBackend {
    /// Queue scoring responses, consumed in order; the last one repeats
    pub fn with_scores(responses: &[&str]) -> Self {
        let backend = MockBackend::default();
        *backend.score_responses.lock().unwrap() =
            responses.iter().map(|s| s.to_string()).collect();
        backend
    }

    pub fn scoring(score: f64) -> String {
        format!(
            r#"{{"score": {score}, "verdict": "Scored", "strengths": ["clear"], "weaknesses": []}}"#
        )
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        if prompt.contains("evaluating a candidate's answer") {
            let mut queue = self.score_responses.lock().unwrap();
            let response = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue
                    .front()
                    .cloned()
                    .unwrap_or_else(|| MockBackend::scoring(4.0))
            };
            Ok(response)
        } else if prompt.contains("extract the key topics") {
            Ok(self.topics_response.clone())
        } else if prompt.contains("providing final feedback") {
            Ok(self.feedback_response.clone())
        } else {
            Ok(self.question_text.clone())
        }
    }
}

/// App state over an in-memory database and the given backend. The temp
/// dir holds media and frame files; keep it alive for the test's duration.
pub async fn test_state(backend: Arc<dyn GenerativeBackend>) -> (AppState, tempfile::TempDir) {
    // One connection: every pooled connection to sqlite::memory: gets its
    // own private database, so a second one would see no schema.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    hireflow::db::init_tables(&pool)
        .await
        .expect("Failed to initialize database schema");

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config::for_tests(temp_dir.path().to_path_buf());
    config
        .ensure_directories()
        .expect("Failed to create data folders");

    let state = AppState::new(
        pool,
        EventBus::new(100),
        ScoringGateway::new(backend),
        FrameAnalyzer::new(Arc::new(BlockFaceDetector::default())),
        Arc::new(config),
    );
    (state, temp_dir)
}

/// Router plus state, for HTTP-level tests
pub async fn test_app(
    backend: Arc<dyn GenerativeBackend>,
) -> (axum::Router, AppState, tempfile::TempDir) {
    let (state, temp_dir) = test_state(backend).await;
    let app = hireflow::build_router(state.clone());
    (app, state, temp_dir)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
