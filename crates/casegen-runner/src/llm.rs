//! Text-generation capability and an OpenAI-compatible binding

use casegen_core::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API key not set: environment variable {0} is empty or missing")]
    MissingApiKey(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("unexpected completion payload: {0}")]
    Protocol(String),
    #[error("model returned an empty completion")]
    EmptyResponse,
}

/// Anything that turns a prompt into text.
pub trait TextGenerator {
    /// # Errors
    ///
    /// Returns [`LlmError`] when no text could be produced.
    fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

impl<F> TextGenerator for F
where
    F: Fn(&str) -> Result<String, LlmError>,
{
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self(prompt)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client with bearer auth.
pub struct ChatCompletionsClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    /// Build a client from config, reading the key from `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] if the variable is unset or blank.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit key.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_api_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl TextGenerator for ChatCompletionsClient {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(model = %self.model, prompt_bytes = prompt.len(), "requesting completion");

        let body = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| LlmError::Http(e.to_string()))?;

        extract_content(&body)
    }
}

/// First choice's message content, trimmed.
///
/// # Errors
///
/// Returns [`LlmError::Protocol`] for a payload that is not a completion and
/// [`LlmError::EmptyResponse`] when the content is missing or blank.
pub fn extract_content(body: &str) -> Result<String, LlmError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Protocol(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(LlmError::EmptyResponse)
}
