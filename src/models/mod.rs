//! Domain entities for the interview pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Interview lifecycle state. `Completed` is terminal; there is no reverse
/// transition and no failed/abandoned state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    InProgress,
    Completed,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(InterviewStatus::InProgress),
            "completed" => Some(InterviewStatus::Completed),
            _ => None,
        }
    }
}

/// One end-to-end assessment session for a candidate
#[derive(Debug, Clone, Serialize)]
pub struct Interview {
    pub id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    /// Optional link to an externally managed application record
    pub application_id: Option<Uuid>,
    pub status: InterviewStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Sum of per-answer scores, set at completion
    pub total_score: Option<f64>,
    /// Typed overall assessment, set at completion
    pub feedback: Option<Feedback>,
    /// Pointer to the question currently being answered, updated each time a
    /// question is generated
    pub current_question_id: Option<Uuid>,
}

/// Which question-type policy produced a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Resume,
    Technical,
    Hr,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Resume => "resume",
            QuestionKind::Technical => "technical",
            QuestionKind::Hr => "hr",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resume" => Some(QuestionKind::Resume),
            "technical" => Some(QuestionKind::Technical),
            "hr" => Some(QuestionKind::Hr),
            _ => None,
        }
    }
}

/// One question asked during an interview. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: Uuid,
    pub interview_id: Uuid,
    /// 1-based, gapless, strictly increasing per interview
    pub seq: i64,
    pub text: String,
    pub source_tag: QuestionKind,
    pub asked_at: DateTime<Utc>,
}

/// The unified record of a candidate's response to one question, merging the
/// streamed transcript with the uploaded recording. At most one exists per
/// question; either arrival path may create it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub interview_id: Uuid,
    pub recording_path: Option<String>,
    pub cropped_recording_path: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    /// AI score in [0, 5]; unset until evaluated
    pub score: Option<f64>,
    pub verdict: Option<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// One incremental piece of recognized speech. Append-only.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptChunk {
    pub id: Uuid,
    pub answer_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub is_final: bool,
}

/// A logged proctoring anomaly observation. Append-only.
#[derive(Debug, Clone, Serialize)]
pub struct ProctorEvent {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub question_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub confidence: f64,
    pub frame_path: Option<String>,
    pub notes: String,
}

/// Result of scoring one answer against its question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    /// Clamped to [0, 5]
    pub score: f64,
    pub verdict: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

impl AnswerEvaluation {
    /// Placeholder result substituted when the model output is unusable
    pub fn placeholder(verdict: &str) -> Self {
        AnswerEvaluation {
            score: 0.0,
            verdict: verdict.to_string(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        }
    }
}

/// Semantic grouping of related questions with an average score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub topic: String,
    /// Average score over the grouped questions, in [0, 5]
    pub score: f64,
    /// Always 5
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Lenient parse of model output, defaulting to Medium
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => ConfidenceLevel::High,
            "low" => ConfidenceLevel::Low,
            _ => ConfidenceLevel::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicationQuality {
    Excellent,
    Good,
    Average,
    Poor,
}

impl CommunicationQuality {
    /// Lenient parse of model output, defaulting to Average
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "excellent" => CommunicationQuality::Excellent,
            "good" => CommunicationQuality::Good,
            "poor" => CommunicationQuality::Poor,
            _ => CommunicationQuality::Average,
        }
    }
}

/// Typed overall assessment stored on the interview at completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub overall_feedback: String,
    pub detailed_feedback: String,
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub confidence_level: ConfidenceLevel,
    pub communication_quality: CommunicationQuality,
    /// Clamped to [0, 100]
    pub suitability_score: f64,
    pub topics: Vec<Topic>,
    pub overall_score: f64,
    pub overall_score_percent: f64,
}

/// Everything the summarizer needs to know about one answered question
#[derive(Debug, Clone)]
pub struct AnswerContext {
    pub answer_id: Uuid,
    pub question: String,
    pub answer_text: String,
    pub score: f64,
    pub verdict: String,
}

/// Background work kinds drained by the task worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    EvaluateAnswer,
    FinalizeInterview,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::EvaluateAnswer => "evaluate_answer",
            TaskKind::FinalizeInterview => "finalize_interview",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "evaluate_answer" => Some(TaskKind::EvaluateAnswer),
            "finalize_interview" => Some(TaskKind::FinalizeInterview),
            _ => None,
        }
    }
}

/// One persisted background-task queue entry
#[derive(Debug, Clone)]
pub struct EvalTask {
    pub id: Uuid,
    pub interview_id: Uuid,
    /// Set for EvaluateAnswer tasks
    pub answer_id: Option<Uuid>,
    pub kind: TaskKind,
    pub attempt: i64,
    pub created_at: DateTime<Utc>,
}
