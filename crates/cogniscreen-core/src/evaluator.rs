//! Answer evaluation collaborator: given a question and a transcript, decide
//! correct (1) or not (0) with a one-sentence explanation.
//!
//! The session controller treats this service as possibly remote and slow, and
//! absorbs any failure into a zero score rather than aborting the interview.

use crate::domain::Question;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";

/// Verdict for one answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// 1 for correct, 0 for incorrect.
    pub score: u8,
    /// Brief explanation in Korean, for the result report.
    pub explanation: String,
}

/// Scores one transcript against one question. May be remote and slow; the
/// caller owns the failure policy.
#[async_trait::async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn evaluate(&self, question: &Question, transcript: &str) -> CoreResult<Evaluation>;
}

/// Local fallback evaluator: correct when the transcript contains the expected
/// answer (case-insensitive). Used when no evaluation API key is configured.
#[derive(Debug, Default)]
pub struct KeywordEvaluator;

#[async_trait::async_trait]
impl AnswerEvaluator for KeywordEvaluator {
    async fn evaluate(&self, question: &Question, transcript: &str) -> CoreResult<Evaluation> {
        let correct = transcript
            .to_lowercase()
            .contains(&question.expected_answer.to_lowercase());
        Ok(Evaluation {
            score: u8::from(correct),
            explanation: if correct {
                "정답입니다.".to_string()
            } else {
                "정답과 다릅니다.".to_string()
            },
        })
    }
}

// OpenAI-compatible request/response for the evaluation call
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct EvaluationJson {
    score: u8,
    explanation: String,
}

/// Remote evaluator over an OpenAI-compatible chat-completions API.
/// Configure with `EVAL_API_URL` (e.g. https://openrouter.ai/api/v1),
/// `EVAL_API_KEY`, and optional `EVAL_MODEL`.
pub struct RemoteEvaluator {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl RemoteEvaluator {
    /// Build from environment. Returns `None` when no API key is configured
    /// (callers fall back to [`KeywordEvaluator`]).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("EVAL_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())?;
        let base_url = std::env::var("EVAL_API_URL")
            .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string());
        let model = std::env::var("EVAL_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self::new(base_url, api_key).with_model(&model))
    }

    /// Create with explicit config (e.g. for tests or non-env wiring).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn prompt(question: &Question, transcript: &str) -> String {
        format!(
            "You are an evaluator for a cognitive screening interview. Decide whether the \
             user's spoken answer is correct. Be flexible with minor phrasing variations, but \
             the core meaning must be correct; calculation and recall answers must be exact.\n\
             - Question: \"{}\"\n\
             - Expected answer: \"{}\"\n\
             - User's answer: \"{}\"\n\
             Respond with a JSON object with two fields: \"score\" (1 for correct, 0 for \
             incorrect) and \"explanation\" (one brief sentence in Korean).",
            question.prompt, question.expected_answer, transcript
        )
    }
}

#[async_trait::async_trait]
impl AnswerEvaluator for RemoteEvaluator {
    async fn evaluate(&self, question: &Question, transcript: &str) -> CoreResult<Evaluation> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Self::prompt(question, transcript),
            }],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Evaluator(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CoreError::Evaluator(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| CoreError::Evaluator(format!("response parse failed: {}", e)))?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| CoreError::Evaluator("empty response".to_string()))?;

        debug!(question_id = question.id, "evaluator verdict: {}", content);

        let verdict: EvaluationJson = serde_json::from_str(&content)
            .map_err(|e| CoreError::Evaluator(format!("invalid verdict JSON: {}", e)))?;
        Ok(Evaluation {
            score: verdict.score.min(1),
            explanation: verdict.explanation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QuestionKind;

    fn question(expected: &str) -> Question {
        Question {
            id: 1,
            category: "계산력".to_string(),
            kind: QuestionKind::General,
            prompt: "100에서 7을 빼면 얼마입니까?".to_string(),
            image_ref: None,
            expected_answer: expected.to_string(),
        }
    }

    #[tokio::test]
    async fn keyword_evaluator_matches_containment() {
        let eval = KeywordEvaluator;
        let verdict = eval.evaluate(&question("93"), "93입니다").await.unwrap();
        assert_eq!(verdict.score, 1);

        let verdict = eval.evaluate(&question("93"), "86입니다").await.unwrap();
        assert_eq!(verdict.score, 0);
    }

    #[tokio::test]
    async fn keyword_evaluator_ignores_ascii_case() {
        let eval = KeywordEvaluator;
        let q = question("Apple");
        let verdict = eval.evaluate(&q, "apple 이요").await.unwrap();
        assert_eq!(verdict.score, 1);
    }
}
