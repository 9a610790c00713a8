use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ClassifierSettings;

/// Why a classifier call produced nothing usable.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("provider rate limit: {0}")]
    RateLimited(String),

    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response contained no keywords")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClassifierError {
    /// Stable reason code for logs and the run ledger.
    pub fn code(&self) -> &'static str {
        match self {
            ClassifierError::Connection(_) => "connection",
            ClassifierError::RateLimited(_) => "rate_limited",
            ClassifierError::Api { .. } => "api",
            ClassifierError::EmptyResponse => "empty_response",
            ClassifierError::Malformed(_) => "malformed",
        }
    }
}

/// Keyword extraction capability: system instructions plus a user prompt
/// in, one comma separated keyword string out.
#[async_trait]
pub trait KeywordClassifier: Send + Sync {
    async fn classify(&self, system: &str, prompt: &str) -> Result<String, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client for any OpenAI compatible endpoint.
pub struct ChatClassifier {
    http: Client,
    endpoint: String,
    model: String,
    token: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

impl ChatClassifier {
    pub fn new(settings: &ClassifierSettings, token: String) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(ChatClassifier {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            token,
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
        })
    }
}

#[async_trait]
impl KeywordClassifier for ChatClassifier {
    async fn classify(&self, system: &str, prompt: &str) -> Result<String, ClassifierError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.endpoint))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::RateLimited(text));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;
        debug!("Classifier returned {} choice(s)", parsed.choices.len());
        first_content(parsed)
    }
}

fn first_content(response: ChatResponse) -> Result<String, ClassifierError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(ClassifierError::EmptyResponse)
}

/// Split the classifier's comma separated answer into keywords.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().trim_matches(|c| c == '"' || c == '`').trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

// ── Tests ──
