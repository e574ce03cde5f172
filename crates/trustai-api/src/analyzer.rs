use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use trustai_types::api::Analysis;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("AI provider is not configured")]
    NotConfigured,
    #[error("AI provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("AI provider returned HTTP {0}")]
    Status(u16),
    #[error("AI provider returned no choices")]
    EmptyReply,
}

impl From<AnalyzerError> for ApiError {
    fn from(e: AnalyzerError) -> Self {
        Self::Downstream(e.to_string())
    }
}

/// Opaque text-trustworthiness scorer.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalyzerError>;
}

pub const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Groq's OpenAI-compatible chat completions API in JSON mode.
pub struct GroqAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GroqAnalyzer {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            endpoint: GROQ_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl TextAnalyzer for GroqAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalyzerError> {
        if self.api_key.is_empty() {
            return Err(AnalyzerError::NotConfigured);
        }

        let body = json!({
            "model": self.model,
            "temperature": 0.1,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": "You are a helpful assistant that outputs JSON." },
                { "role": "user", "content": build_prompt(text) },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::Status(status.as_u16()));
        }

        let completion: ChatCompletion = response.json().await?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .ok_or(AnalyzerError::EmptyReply)?;

        Ok(parse_model_reply(&reply.message.content))
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        r####"You are TrustAI, an AI that evaluates the trustworthiness of text.
Analyze the following content and return ONLY valid JSON:
{{
  "score": 0-100,
  "verdict": "trustworthy" | "neutral" | "risky",
  "citations": ["citation 1", "citation 2"],
  "analysis_markdown": "### Full Markdown Analysis Here"
}}

Content to analyze:
{text}"####
    )
}

/// Lenient view of the model's JSON. Anything missing falls back to defaults.
#[derive(Debug, Deserialize)]
struct ModelReply {
    score: f64,
    #[serde(default)]
    verdict: String,
    #[serde(default)]
    citations: Vec<String>,
    #[serde(default)]
    analysis_markdown: String,
}

/// An unparseable reply degrades to a zero-score "error" verdict instead of
/// failing the request.
pub fn parse_model_reply(content: &str) -> Analysis {
    match serde_json::from_str::<ModelReply>(content) {
        Ok(reply) => Analysis {
            score: if reply.score.is_finite() { reply.score.clamp(0.0, 100.0) } else { 0.0 },
            verdict: reply.verdict,
            citations: reply.citations,
            analysis_markdown: reply.analysis_markdown,
        },
        Err(e) => {
            warn!("Unparseable AI reply: {}", e);
            Analysis {
                score: 0.0,
                verdict: "error".to_string(),
                citations: vec![],
                analysis_markdown: "Error parsing AI response.".to_string(),
            }
        }
    }
}
