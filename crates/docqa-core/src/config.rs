//! Configuration for ingestion and retrieval

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{Error, Result};

/// Which embedder backs ingestion and query embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local feature-hashing embedder, no network required
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint
    Http,
}

impl FromStr for EmbeddingProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" | "local" => Ok(EmbeddingProvider::Hash),
            "http" | "openai" | "remote" => Ok(EmbeddingProvider::Http),
            other => Err(Error::Configuration(format!(
                "Unknown embedding provider '{}' (expected 'hash' or 'http')",
                other
            ))),
        }
    }
}

/// Embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub dimension: usize,
    pub model: String,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hash,
            dimension: 384,
            model: "all-MiniLM-L12-v2".to_string(),
            api_url: "http://localhost:8080/v1".to_string(),
            api_key: None,
            timeout_secs: 30,
            batch_size: 32,
        }
    }
}

/// Settings for the ingestion and retrieval pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// Raw dot-product cutoff; results at or below it are discarded
    pub similarity_threshold: f32,
    /// Characters of each passage that reach the assembled context
    pub context_chars_per_passage: usize,
    pub store_path: PathBuf,
    pub staging_dir: PathBuf,
    pub embedding: EmbeddingConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 3000,
            chunk_overlap: 200,
            top_k: 3,
            similarity_threshold: 0.1,
            context_chars_per_passage: 500,
            store_path: PathBuf::from("./data/passages.json"),
            staging_dir: PathBuf::from("./uploaded_docs"),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl RagConfig {
    /// Create configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let embedding_defaults = EmbeddingConfig::default();

        let embedding = EmbeddingConfig {
            provider: parse_or(&lookup, "DOCQA_EMBEDDING_PROVIDER", embedding_defaults.provider)?,
            dimension: parse_or(&lookup, "DOCQA_EMBEDDING_DIM", embedding_defaults.dimension)?,
            model: lookup("DOCQA_EMBEDDING_MODEL").unwrap_or(embedding_defaults.model),
            api_url: lookup("DOCQA_EMBEDDING_URL").unwrap_or(embedding_defaults.api_url),
            api_key: lookup("DOCQA_EMBEDDING_API_KEY").filter(|key| !key.trim().is_empty()),
            timeout_secs: parse_or(&lookup, "DOCQA_EMBEDDING_TIMEOUT_SECS", embedding_defaults.timeout_secs)?,
            batch_size: parse_or(&lookup, "DOCQA_EMBEDDING_BATCH_SIZE", embedding_defaults.batch_size)?,
        };

        let config = Self {
            chunk_size: parse_or(&lookup, "DOCQA_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(&lookup, "DOCQA_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parse_or(&lookup, "DOCQA_TOP_K", defaults.top_k)?,
            similarity_threshold: parse_or(
                &lookup,
                "DOCQA_SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            )?,
            context_chars_per_passage: parse_or(
                &lookup,
                "DOCQA_CONTEXT_CHARS",
                defaults.context_chars_per_passage,
            )?,
            store_path: lookup("DOCQA_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            staging_dir: lookup("DOCQA_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            embedding,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be positive".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::Configuration(
                "embedding dimension must be positive".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::Configuration(
                "embedding batch size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|e| {
            Error::Configuration(format!("Invalid value '{}' for {}: {}", raw, key, e))
        }),
        _ => Ok(default),
    }
}
