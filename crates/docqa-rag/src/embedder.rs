//! Embedder implementations

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use docqa_core::{
    check_embedding, Embedder, EmbeddingConfig, EmbeddingProvider, Error, Result,
};

/// Requests in flight at once when embedding a large batch over HTTP
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Weight of adjacent word pairs relative to single words
const BIGRAM_WEIGHT: f32 = 0.5;

/// Build the embedder selected by configuration
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(config.dimension)?)),
        EmbeddingProvider::Http => Ok(Arc::new(HttpEmbedder::new(config)?)),
    }
}

/// Local feature-hashing embedder.
///
/// Lowercased words and adjacent word pairs are hashed with md5 into
/// `dimension` buckets and the result is L2-normalised, so the dot product of
/// two embeddings is their cosine similarity. Needs no model files or network.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Configuration(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    /// Embed without going through the async interface
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let words = tokenize(text);
        let mut embedding = vec![0.0; self.dimension];

        for word in &words {
            embedding[self.bucket(word)] += 1.0;
        }

        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            embedding[self.bucket(&bigram)] += BIGRAM_WEIGHT;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in embedding.iter_mut() {
                *value /= magnitude;
            }
        }

        embedding
    }

    fn bucket(&self, feature: &str) -> usize {
        let digest = md5::compute(feature.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.0[..8]);
        (u64::from_le_bytes(bytes) % self.dimension as u64) as usize
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|text| embedder.embed_text(text))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::Embedding(format!("Embedding task failed: {}", e)))
    }
}

/// Client for OpenAI-compatible `/embeddings` endpoints
/// (OpenAI, text-embeddings-inference, Ollama, LocalAI, ...)
pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    dimension: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(Error::Configuration("missing embedding model name".to_string()));
        }
        if config.dimension == 0 || config.batch_size == 0 {
            return Err(Error::Configuration(
                "embedding dimension and batch size must be positive".to_string(),
            ));
        }

        let endpoint = Url::parse(&format!(
            "{}/embeddings",
            config.api_url.trim_end_matches('/')
        ))
        .map_err(|e| {
            Error::Configuration(format!("Invalid embedding URL '{}': {}", config.api_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size,
        })
    }

    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let mut request = self.client.post(self.endpoint().clone()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Embedding(format!(
                "Embedding request failed with status {}: {}",
                status, error_text
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid embedding response: {}", e)))?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(Error::Embedding(format!(
                "Endpoint returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        parsed
            .data
            .into_iter()
            .map(|entry| {
                check_embedding(&entry.embedding, self.dimension)?;
                Ok(entry.embedding)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Endpoint returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<_> = texts
            .chunks(self.batch_size)
            .map(|batch| self.request(batch))
            .collect();

        let batches: Vec<Vec<Vec<f32>>> = futures::stream::iter(requests)
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}
