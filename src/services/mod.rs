//! Service layer: the interview pipeline itself

pub mod aggregator;
pub mod evaluator;
pub mod frame_analyzer;
pub mod media_processor;
pub mod reconciler;
pub mod scoring_gateway;
pub mod session;
pub mod task_worker;

pub use frame_analyzer::{BlockFaceDetector, FrameAnalyzer};
pub use scoring_gateway::{GeminiBackend, GenerativeBackend, ScoringGateway};
