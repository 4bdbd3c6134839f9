//! hireflow library interface
//!
//! Automated video-interview service: question sequencing, transcript and
//! recording reconciliation, AI scoring, assessment aggregation, and frame
//! proctoring.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, Error, Result};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};
use uuid::Uuid;

use crate::config::Config;
use crate::events::EventBus;
use crate::services::{FrameAnalyzer, ScoringGateway};

/// Uploads are interview recordings; allow up to 256 MiB
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Realtime connection registry, scoped per interview. Lookup and
/// accounting never touch connections of other interviews.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, HashSet<Uuid>>>>,
}

impl ConnectionRegistry {
    /// Register a new connection for an interview, returning its handle
    pub async fn register(&self, interview_id: Uuid) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.inner
            .write()
            .await
            .entry(interview_id)
            .or_default()
            .insert(connection_id);
        connection_id
    }

    /// Remove a connection; empty interview entries are dropped
    pub async fn deregister(&self, interview_id: Uuid, connection_id: Uuid) {
        let mut inner = self.inner.write().await;
        if let Some(connections) = inner.get_mut(&interview_id) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                inner.remove(&interview_id);
            }
        }
    }

    /// Open connections for one interview
    pub async fn count(&self, interview_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .get(&interview_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Generative-model adapter
    pub gateway: ScoringGateway,
    /// Frame anomaly analyzer for proctoring and crop targeting
    pub analyzer: FrameAnalyzer,
    /// Service configuration
    pub config: Arc<Config>,
    /// Per-interview serialization for question sequence allocation
    interview_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
    /// Realtime connections, keyed by interview
    pub connections: ConnectionRegistry,
    /// Wakes the background task worker when work is enqueued
    pub task_notify: Arc<Notify>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last background error for diagnostics
    last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        gateway: ScoringGateway,
        analyzer: FrameAnalyzer,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            event_bus,
            gateway,
            analyzer,
            config,
            interview_locks: Arc::new(Mutex::new(HashMap::new())),
            connections: ConnectionRegistry::default(),
            task_notify: Arc::new(Notify::new()),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Lock guarding question sequencing for one interview. Entries are
    /// created on first use and live for the process; interview counts
    /// are small.
    pub async fn interview_lock(&self, interview_id: Uuid) -> Arc<Mutex<()>> {
        self.interview_locks
            .lock()
            .await
            .entry(interview_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn set_last_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::interviews::routes())
        .merge(api::questions::routes())
        .merge(api::answers::routes())
        .merge(api::transcripts::routes())
        .merge(api::proctor::routes())
        .merge(api::ws::routes())
        .merge(api::health::routes())
        .route("/events", get(api::sse::event_stream))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
