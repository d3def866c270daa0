//! Groq chat completion client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use docqa_core::{Error, LLMProvider, Result};

use crate::config::GroqConfig;

/// Client for Groq's OpenAI-compatible chat completions API
pub struct GroqClient {
    config: GroqConfig,
    client: Client,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl GroqClient {
    pub const LLAMA_3_1_8B_INSTANT: &'static str = "llama-3.1-8b-instant";
    pub const LLAMA_3_3_70B_VERSATILE: &'static str = "llama-3.3-70b-versatile";

    /// Create a new Groq client from configuration
    pub fn new(config: GroqConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Configuration("missing Groq API key".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new Groq client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GroqConfig::from_env()?)
    }

    /// Set the model to use for completions
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.config.model = model_id.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'))
    }

    async fn perform_completion(&self, prompt: &str) -> Result<String> {
        let request_body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LLMProvider(format!(
                "Groq API request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        let answer = clean_response(&content);
        if answer.is_empty() {
            return Err(Error::LLMProvider("Empty response from Groq API".to_string()));
        }
        Ok(answer)
    }
}

/// Trim the completion and drop an echoed `Answer:` label
fn clean_response(text: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("Answer:")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

#[async_trait]
impl LLMProvider for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let limit = Duration::from_secs(self.config.timeout_secs);
        tracing::debug!("Requesting completion from {}", self.config.model);

        match timeout(limit, self.perform_completion(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(Error::LLMProvider(format!(
                "Groq request timed out after {}s",
                self.config.timeout_secs
            ))),
        }
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
