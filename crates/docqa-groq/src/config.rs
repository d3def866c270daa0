//! Groq configuration

use serde::{Deserialize, Serialize};
use std::env;

use docqa_core::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Configuration for the Groq chat completion client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl GroqConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GROQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration("GROQ_API_KEY environment variable not found".to_string())
            })?;

        let mut config = Self::new(api_key);
        if let Some(model) = lookup("GROQ_MODEL") {
            config.model = model;
        }
        if let Some(api_url) = lookup("GROQ_API_URL") {
            config.api_url = api_url;
        }
        if let Some(timeout) = lookup("GROQ_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse().map_err(|_| {
                Error::Configuration(format!("GROQ_TIMEOUT_SECS must be an integer, got '{}'", timeout))
            })?;
        }
        Ok(config)
    }

    /// Create configuration with explicit values
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}
