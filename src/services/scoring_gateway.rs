//! Scoring gateway: adapter over the generative model
//!
//! Everything the pipeline asks of the model goes through here: scoring one
//! answer, grouping questions into topics, writing the overall narrative,
//! and generating question text. The gateway owns response-shape repair
//! (models wrap JSON in code fences and drop fields) and score clamping.
//! Unparsable output becomes a defined placeholder result; a parse failure
//! never crosses this boundary.

use crate::models::{
    AnswerContext, AnswerEvaluation, CommunicationQuality, ConfidenceLevel, Feedback, QuestionKind,
    Topic,
};
use crate::services::aggregator::ScoreSummary;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gateway errors. Both are absorbed into placeholder results by the
/// callers in this module; they exist to distinguish log lines.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream response malformed: {0}")]
    Malformed(String),
}

/// The opaque text-in/text-out seam. Production uses Gemini over REST;
/// tests script responses.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Gemini REST backend
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(format!(
                "HTTP {}: {}",
                status, text
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Malformed("No candidate text in response".to_string()))
    }
}

/// Adapter exposing the model as typed scoring operations
#[derive(Clone)]
pub struct ScoringGateway {
    backend: Arc<dyn GenerativeBackend>,
}

impl ScoringGateway {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Score one answer against its question. Always returns a result;
    /// backend or parse failures yield the zero-score placeholder.
    pub async fn score_answer(&self, question: &str, answer_text: &str) -> AnswerEvaluation {
        let prompt = format!(
            "You are an expert HR interviewer evaluating a candidate's answer.\n\n\
             Question Asked:\n{question}\n\n\
             Candidate's Answer:\n{answer_text}\n\n\
             Evaluate this answer on a scale of 0-5 based on:\n\
             1. Relevance to the question (25%)\n\
             2. Clarity and communication (25%)\n\
             3. Depth and detail (25%)\n\
             4. Practical experience/examples (25%)\n\n\
             Return ONLY valid JSON with this exact structure:\n\
             {{\"score\": 4.5, \"verdict\": \"Brief explanation (2-3 sentences)\", \
             \"strengths\": [\"Strength 1\"], \"weaknesses\": [\"Weakness 1\"]}}\n\n\
             Return ONLY the JSON, no additional text."
        );

        let raw = match self.backend.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Answer scoring call failed: {}", e);
                return AnswerEvaluation::placeholder(
                    "Unable to evaluate answer due to processing error",
                );
            }
        };

        match parse_json_payload(&raw) {
            Ok(value) => {
                let evaluation = AnswerEvaluation {
                    score: clamp(number_field(&value, "score"), 0.0, 5.0),
                    verdict: string_field(&value, "verdict")
                        .unwrap_or_else(|| "Unable to generate verdict".to_string()),
                    strengths: list_field(&value, "strengths"),
                    weaknesses: list_field(&value, "weaknesses"),
                };
                info!("Answer evaluated: score {}/5", evaluation.score);
                evaluation
            }
            Err(e) => {
                warn!("Answer scoring response unparsable: {}", e);
                AnswerEvaluation::placeholder("Unable to evaluate answer due to processing error")
            }
        }
    }

    /// Group the interview's questions into 5-7 semantic topics with
    /// average scores. Failure falls back to one singleton topic per
    /// question, deterministically.
    pub async fn extract_topics(&self, answers: &[AnswerContext]) -> Vec<Topic> {
        let questions_summary = answers
            .iter()
            .enumerate()
            .map(|(idx, ans)| {
                format!("Q{} (Score: {}/5): {}", idx + 1, ans.score, ans.question)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Analyze these interview questions and extract the key topics/skills being evaluated.\n\n\
             Questions and Scores:\n{questions_summary}\n\n\
             Extract 5-7 main topics/skills that these questions are testing. For each topic, \
             calculate an average score based on the questions that relate to it.\n\n\
             Return ONLY valid JSON with this exact structure:\n\
             {{\"topics\": [{{\"topic\": \"PROBLEM SOLVING\", \"score\": 4.5, \"max\": 5}}]}}\n\n\
             Rules:\n\
             - Topic names should be in UPPERCASE\n\
             - Score should be the average of related questions\n\
             - Max is always 5\n\n\
             Return ONLY the JSON, no additional text."
        );

        let parsed = match self.backend.generate(&prompt).await {
            Ok(raw) => parse_json_payload(&raw),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(value) => {
                let topics: Vec<Topic> = value
                    .get("topics")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| {
                                Some(Topic {
                                    topic: string_field(item, "topic")?,
                                    score: clamp(number_field(item, "score"), 0.0, 5.0),
                                    max: 5.0,
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                if topics.is_empty() {
                    warn!("Topic extraction returned no topics, using fallback");
                    fallback_topics(answers)
                } else {
                    info!("Extracted {} topics from questions", topics.len());
                    topics
                }
            }
            Err(e) => {
                warn!("Topic extraction failed: {}", e);
                fallback_topics(answers)
            }
        }
    }

    /// Generate the overall narrative feedback. The numeric fields come
    /// from the locally computed summary and survive any model failure;
    /// only the text is at the model's mercy.
    pub async fn overall_feedback(
        &self,
        answers: &[AnswerContext],
        summary: &ScoreSummary,
        topics: Vec<Topic>,
    ) -> Feedback {
        let mut context = format!(
            "Interview Summary:\nTotal Questions: {}\nOverall Score: {:.1}/{:.1} ({:.1}%)\n\n",
            answers.len(),
            summary.overall_score,
            summary.max_score,
            summary.overall_score_percent
        );
        for (idx, ans) in answers.iter().enumerate() {
            let excerpt: String = ans.answer_text.chars().take(200).collect();
            context.push_str(&format!(
                "Q{}: {}\nAnswer: {}...\nScore: {}/5\nVerdict: {}\n\n",
                idx + 1,
                ans.question,
                excerpt,
                ans.score,
                ans.verdict
            ));
        }
        context.push_str("\nTopic-wise Performance:\n");
        for topic in &topics {
            context.push_str(&format!("- {}: {}/{}\n", topic.topic, topic.score, topic.max));
        }

        let prompt = format!(
            "You are an expert HR interviewer providing final feedback for a candidate.\n\n\
             {context}\n\
             Generate comprehensive feedback with an overall assessment (4-5 sentences) and \
             detailed feedback (6-8 sentences covering strongest topics, struggles, \
             communication quality, confidence, recommendations, and suitability).\n\n\
             Return ONLY valid JSON with this exact structure:\n\
             {{\"overall_feedback\": \"...\", \"detailed_feedback\": \"...\", \
             \"key_strengths\": [\"...\"], \"areas_for_improvement\": [\"...\"], \
             \"confidence_level\": \"High/Medium/Low\", \
             \"communication_quality\": \"Excellent/Good/Average/Poor\", \
             \"suitability_score\": 75}}\n\n\
             Return ONLY the JSON, no additional text."
        );

        let parsed = match self.backend.generate(&prompt).await {
            Ok(raw) => parse_json_payload(&raw),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(value) => Feedback {
                overall_feedback: string_field(&value, "overall_feedback")
                    .unwrap_or_else(|| "Unable to generate overall feedback".to_string()),
                detailed_feedback: string_field(&value, "detailed_feedback")
                    .unwrap_or_else(|| "Unable to generate detailed feedback".to_string()),
                key_strengths: list_field(&value, "key_strengths"),
                areas_for_improvement: list_field(&value, "areas_for_improvement"),
                confidence_level: ConfidenceLevel::parse_lenient(
                    &string_field(&value, "confidence_level").unwrap_or_default(),
                ),
                communication_quality: CommunicationQuality::parse_lenient(
                    &string_field(&value, "communication_quality").unwrap_or_default(),
                ),
                suitability_score: clamp(number_field(&value, "suitability_score"), 0.0, 100.0),
                topics,
                overall_score: summary.overall_score,
                overall_score_percent: summary.overall_score_percent,
            },
            Err(e) => {
                warn!("Overall feedback generation failed: {}", e);
                Feedback {
                    overall_feedback: "Unable to generate overall feedback".to_string(),
                    detailed_feedback: "Unable to generate detailed feedback".to_string(),
                    key_strengths: Vec::new(),
                    areas_for_improvement: Vec::new(),
                    confidence_level: ConfidenceLevel::Medium,
                    communication_quality: CommunicationQuality::Average,
                    suitability_score: 0.0,
                    topics,
                    overall_score: summary.overall_score,
                    overall_score_percent: summary.overall_score_percent,
                }
            }
        }
    }

    /// Generate the text of the next interview question. Difficulty defaults
    /// by position (early questions are harder) unless the caller overrides
    /// it. A backend failure falls back to a generic question rather than
    /// failing the session.
    pub async fn generate_question(
        &self,
        kind: QuestionKind,
        question_number: u32,
        total_questions: u32,
        job_role: &str,
        difficulty: Option<&str>,
        language: Option<&str>,
    ) -> String {
        let type_instruction = match kind {
            QuestionKind::Resume => {
                "Ask about their past experience, skills, education, or work history"
            }
            QuestionKind::Technical => {
                "Ask about technical skills, job-specific knowledge, problem-solving abilities, or industry expertise"
            }
            QuestionKind::Hr => {
                "Ask about their motivation, career goals, cultural fit, work style, or behavioral aspects"
            }
        };
        let difficulty = difficulty.unwrap_or(if question_number <= 3 {
            "Difficult"
        } else {
            "Normal"
        });

        let mut prompt = format!(
            "You are conducting a job interview for a {job_role} position.\n\n\
             Generate interview question #{question_number} of {total_questions}.\n\
             Question Type: {}\n\
             Difficulty level: {difficulty}\n\n\
             Question Requirements:\n\
             - {type_instruction}\n\
             - Keep questions practical and relevant to {job_role}\n\
             - Questions should be answerable in 30-60 seconds\n\
             - Make it conversational and realistic\n\n",
            kind.as_str().to_uppercase()
        );
        if let Some(language) = language {
            prompt.push_str(&format!("Ask the question in {language}.\n\n"));
        }
        prompt.push_str("Generate ONLY the question text, no additional formatting or labels.");

        match self.backend.generate(&prompt).await {
            Ok(text) => strip_code_fences(&text).trim().to_string(),
            Err(e) => {
                warn!("Question generation failed, using fallback: {}", e);
                format!(
                    "Tell me about your experience relevant to a {} role.",
                    job_role
                )
            }
        }
    }
}

/// One singleton topic per question, scored with that question's score
fn fallback_topics(answers: &[AnswerContext]) -> Vec<Topic> {
    answers
        .iter()
        .enumerate()
        .map(|(idx, ans)| Topic {
            topic: format!("QUESTION {}", idx + 1),
            score: clamp(Some(ans.score), 0.0, 5.0),
            max: 5.0,
        })
        .collect()
}

/// Strip markdown code fences the model wraps JSON in
fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse the model's reply as a JSON object, tolerating code fences
fn parse_json_payload(raw: &str) -> Result<Value, GatewayError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned).map_err(|e| GatewayError::Malformed(e.to_string()))
}

/// Numeric field that may arrive as a number or a numeric string
fn number_field(value: &Value, key: &str) -> Option<f64> {
    let field = value.get(key)?;
    field
        .as_f64()
        .or_else(|| field.as_str().and_then(|s| s.trim().parse().ok()))
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn list_field(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn clamp(value: Option<f64>, min: f64, max: f64) -> f64 {
    value.unwrap_or(0.0).clamp(min, max)
}
