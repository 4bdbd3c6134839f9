//! hireflow - Automated video-interview service
//!
//! Serves the interview pipeline over HTTP: question generation, realtime
//! transcript intake, recording upload, background AI evaluation, and
//! assessment reporting.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hireflow::config::Config;
use hireflow::events::EventBus;
use hireflow::services::{
    task_worker, BlockFaceDetector, FrameAnalyzer, GeminiBackend, ScoringGateway,
};
use hireflow::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting hireflow interview service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration (env vars over config file over defaults)
    let config = Config::load()?;
    config.ensure_directories()?;
    info!("Data directory: {}", config.data_dir.display());

    if config.gemini_api_key.is_empty() {
        warn!("GOOGLE_API_KEY not set; scoring will fall back to placeholder results");
    }

    // Open or create database
    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = hireflow::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(100);

    // Scoring gateway over the generative model
    let backend = GeminiBackend::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    let gateway = ScoringGateway::new(Arc::new(backend));

    // Frame analyzer for proctoring and crop targeting
    let analyzer = FrameAnalyzer::new(Arc::new(BlockFaceDetector::default()));

    let port = config.port;
    let state = AppState::new(db_pool, event_bus, gateway, analyzer, Arc::new(config));

    // Background worker drains the evaluation queue
    task_worker::spawn(state.clone());

    let app = hireflow::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
