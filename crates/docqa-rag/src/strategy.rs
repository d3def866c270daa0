//! Retrieval strategies
//!
//! Finding passages for a query is one capability with interchangeable
//! implementations: vector similarity, lexical matching, and a combinator that
//! tries one and falls back to the other when it fails.

use async_trait::async_trait;
use std::sync::Arc;

use docqa_core::{DocumentStore, Embedder, Result, ScoredPassage};

/// Finds candidate passages for a query, highest score first
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>>;
}

/// Embed the query and rank stored passages by dot product
pub struct VectorSearch {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
}

impl VectorSearch {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn DocumentStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl RetrievalStrategy for VectorSearch {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        tracing::debug!("Generating query embedding...");
        let embedding = self.embedder.embed(query).await?;
        tracing::debug!("Running similarity search over stored passages...");
        let results = self.store.vector_search(&embedding, k).await?;
        tracing::debug!("Similarity search returned {} passages", results.len());
        Ok(results)
    }
}

/// Rank stored passages by query term overlap
pub struct LexicalSearch {
    store: Arc<dyn DocumentStore>,
}

impl LexicalSearch {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RetrievalStrategy for LexicalSearch {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        let results = self.store.text_search(query, k).await?;
        tracing::debug!("Text search returned {} passages", results.len());
        Ok(results)
    }
}

/// Try `primary`; if it errors, answer from `fallback` instead.
///
/// The primary error is logged and swallowed. Only when the fallback fails
/// too does the caller see an error (the fallback's).
pub struct FallbackSearch {
    primary: Arc<dyn RetrievalStrategy>,
    fallback: Arc<dyn RetrievalStrategy>,
}

impl FallbackSearch {
    pub fn new(primary: Arc<dyn RetrievalStrategy>, fallback: Arc<dyn RetrievalStrategy>) -> Self {
        Self { primary, fallback }
    }

    /// Vector search over `store`, degrading to lexical search on failure
    pub fn vector_with_lexical_fallback(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::new(
            Arc::new(VectorSearch::new(embedder, store.clone())),
            Arc::new(LexicalSearch::new(store)),
        )
    }
}

#[async_trait]
impl RetrievalStrategy for FallbackSearch {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        match self.primary.search(query, k).await {
            Ok(results) => Ok(results),
            Err(e) => {
                tracing::warn!(
                    "{} search failed ({}), falling back to {} search",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.search(query, k).await
            }
        }
    }
}
