use serde::{Deserialize, Serialize};

use crate::api::{endpoint, map_reqwest_error, read_json, ApiError, ApiFailure, ApiSettings};

pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.perplexity.ai";
const COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: "llama-3.1-sonar-small-128k-online".to_string(),
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

/// Chat-completions client with bearer authentication.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    settings: ChatSettings,
}

impl ChatClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        settings: ChatSettings,
        api: &ApiSettings,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: api.build_client()?,
            api_key: api_key.into(),
            base_url: base_url.into(),
            settings,
        })
    }

    /// Sends one user message and returns the first choice's text.
    pub async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let response = self
            .client
            .post(endpoint(&self.base_url, COMPLETIONS_PATH)?)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let reply: ChatResponse = read_json(response).await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ApiError::new(ApiFailure::Decode, "response has no choices"))
    }
}
