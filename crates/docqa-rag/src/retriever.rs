//! Retriever: query → relevant passages, or an explicit "nothing relevant"

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use docqa_core::{DocumentStore, Embedder, RagConfig, ScoredPassage};

use crate::strategy::{FallbackSearch, RetrievalStrategy};

/// Retrieval tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Matches must score strictly above this cutoff
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            similarity_threshold: 0.1,
        }
    }
}

impl From<&RagConfig> for RetrievalConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
        }
    }
}

/// Outcome of a retrieval.
///
/// `NoRelevantDocuments` is distinct from an empty store: callers use it to
/// switch from document-grounded answering to general knowledge.
#[derive(Debug, Clone)]
pub enum Retrieval {
    Relevant(Vec<ScoredPassage>),
    NoRelevantDocuments,
}

impl Retrieval {
    pub fn passages(&self) -> &[ScoredPassage] {
        match self {
            Retrieval::Relevant(passages) => passages,
            Retrieval::NoRelevantDocuments => &[],
        }
    }

    pub fn is_relevant(&self) -> bool {
        matches!(self, Retrieval::Relevant(_))
    }

    pub fn into_passages(self) -> Vec<ScoredPassage> {
        match self {
            Retrieval::Relevant(passages) => passages,
            Retrieval::NoRelevantDocuments => Vec::new(),
        }
    }
}

/// Runs a retrieval strategy and filters out weak matches. Never fails.
pub struct Retriever {
    strategy: Arc<dyn RetrievalStrategy>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(strategy: Arc<dyn RetrievalStrategy>, config: RetrievalConfig) -> Self {
        Self { strategy, config }
    }

    /// Vector search over `store` with lexical fallback
    pub fn with_store(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self::new(
            Arc::new(FallbackSearch::vector_with_lexical_fallback(embedder, store)),
            config,
        )
    }

    /// Retrieve using the configured `top_k`
    pub async fn retrieve_default(&self, query: &str) -> Retrieval {
        self.retrieve(query, self.config.top_k).await
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Retrieval {
        let results = match self.strategy.search(query, k).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("Error in document retrieval: {}", e);
                return Retrieval::NoRelevantDocuments;
            }
        };

        if results.is_empty() {
            tracing::debug!("Retrieval found no passages for query");
            return Retrieval::NoRelevantDocuments;
        }

        let total = results.len();
        let relevant: Vec<ScoredPassage> = results
            .into_iter()
            .filter(|passage| passage.similarity > self.config.similarity_threshold)
            .collect();

        tracing::debug!(
            "Kept {} of {} passages above threshold {}",
            relevant.len(),
            total,
            self.config.similarity_threshold
        );

        if relevant.is_empty() {
            Retrieval::NoRelevantDocuments
        } else {
            Retrieval::Relevant(relevant)
        }
    }
}
