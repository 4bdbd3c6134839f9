//! Event types and broadcast bus for the interview pipeline
//!
//! Events are emitted by the services as the pipeline advances and streamed
//! to monitoring clients over SSE. Nothing in the core waits on a subscriber;
//! emitting into an empty bus is not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// An interview was created
    InterviewStarted {
        interview_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A question was generated and asked
    QuestionAsked {
        interview_id: Uuid,
        question_id: Uuid,
        seq: i64,
        timestamp: DateTime<Utc>,
    },

    /// An answer finished background evaluation
    AnswerEvaluated {
        interview_id: Uuid,
        answer_id: Uuid,
        score: f64,
        timestamp: DateTime<Utc>,
    },

    /// An interview completed and its overall feedback was persisted
    InterviewCompleted {
        interview_id: Uuid,
        overall_score: f64,
        overall_score_percent: f64,
        timestamp: DateTime<Utc>,
    },

    /// A proctoring anomaly was recorded
    ProctorEventLogged {
        interview_id: Uuid,
        event_type: String,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// SSE event name for this variant
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::InterviewStarted { .. } => "InterviewStarted",
            PipelineEvent::QuestionAsked { .. } => "QuestionAsked",
            PipelineEvent::AnswerEvaluated { .. } => "AnswerEvaluated",
            PipelineEvent::InterviewCompleted { .. } => "InterviewCompleted",
            PipelineEvent::ProctorEventLogged { .. } => "ProctorEventLogged",
        }
    }
}

/// Broadcast bus connecting the services to SSE subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; a bus with no subscribers drops it silently
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_events_reach_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(PipelineEvent::InterviewStarted {
            interview_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "InterviewStarted");
    }

    #[test]
    fn emit_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(16);
        bus.emit(PipelineEvent::InterviewStarted {
            interview_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });
    }
}
