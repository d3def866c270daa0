//! Embedder trait

use async_trait::async_trait;

use crate::{Error, Result};

/// Maps text to a dense vector of fixed dimension.
///
/// Implementations must be deterministic: the same text under the same
/// configuration always yields the same vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Output dimension of every vector this embedder produces
    fn dimension(&self) -> usize;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Reject vectors that are empty, non-finite, or of the wrong length
pub fn check_embedding(embedding: &[f32], expected: usize) -> Result<()> {
    if embedding.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    if embedding.is_empty() {
        return Err(Error::Embedding("Empty embedding vector".to_string()));
    }
    if embedding.iter().any(|value| !value.is_finite()) {
        return Err(Error::Embedding(
            "Embedding contains non-finite values".to_string(),
        ));
    }
    Ok(())
}
