//! Retrieval-augmented question answering over uploaded documents
//!
//! This crate provides the ingestion pipeline (staging, loading, chunking,
//! embedding), the passage store, retrieval with a relevance threshold, and
//! context assembly for answer generation.

pub mod answer;
pub mod chunker;
pub mod context;
pub mod document_store;
pub mod embedder;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod staging;
pub mod strategy;

#[cfg(test)]
mod tests;

pub use answer::QuestionAnswerer;
pub use chunker::{Chunker, PageChunk};
pub use context::{AssembledContext, ContextAssembler};
pub use document_store::LocalDocumentStore;
pub use embedder::{embedder_from_config, HashEmbedder, HttpEmbedder};
pub use loader::DocumentFormat;
pub use pipeline::{IngestionPipeline, IngestionReport};
pub use retriever::{Retrieval, RetrievalConfig, Retriever};
pub use staging::{StagedFile, StagingArea};
pub use strategy::{FallbackSearch, LexicalSearch, RetrievalStrategy, VectorSearch};

// Re-export core types for convenience
pub use docqa_core::{
    Answer, DocumentPage, DocumentStore, Embedder, Error, LLMProvider, MatchKind,
    PassageRecord, RagConfig, Result, ScoredPassage, SourceFilter, StoreStats, UploadedFile,
};
