use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::InsightConfig;
use crate::error::InsightError;

/// System message sent ahead of every prompt.
pub const PERSONA: &str = "You are an economist providing macroeconomic insights.";

/// One round trip to a text-generation service.
///
/// Implementations never surface raw transport faults: anything that goes
/// wrong is reported as [`InsightError::ServiceUnavailable`].
#[async_trait]
pub trait InsightClient: Send + Sync {
    async fn fetch_insight(&self, prompt: &str) -> Result<String, InsightError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(model: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: PERSONA.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Why a request failed. Only logged; callers see `ServiceUnavailable`.
#[derive(Error, Debug)]
enum RequestError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected response: {0}")]
    Protocol(String),
}

/// Extracts `choices[0].message.content` from a chat-completion body.
fn parse_completion(body: &str) -> Result<String, RequestError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| RequestError::Protocol(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RequestError::Protocol("empty choices".to_string()))?
        .message
        .content
        .ok_or_else(|| RequestError::Protocol("choice has no content".to_string()))
}

/// HTTP adapter for OpenAI-compatible chat-completion endpoints.
#[derive(Clone)]
pub struct ChatCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &InsightConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &InsightConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn request(&self, prompt: &str) -> Result<String, RequestError> {
        let api_key = self.api_key.as_deref().ok_or(RequestError::MissingCredential)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&ChatRequest::new(&self.model, prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RequestError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_completion(&body)
    }
}

#[async_trait]
impl InsightClient for ChatCompletionClient {
    async fn fetch_insight(&self, prompt: &str) -> Result<String, InsightError> {
        self.request(prompt).await.map_err(|e| {
            tracing::warn!(endpoint = %self.endpoint, "insight request failed: {e}");
            InsightError::ServiceUnavailable
        })
    }
}
