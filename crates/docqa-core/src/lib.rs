//! Core traits and types for docqa
//!
//! This crate defines the fundamental traits and types used across the docqa system.
//! It provides capability-facing interfaces for embedders, document stores and LLM
//! providers, so the retrieval pipeline can be tested with stand-ins and extended
//! with new backends.

pub mod config;
pub mod document_store;
pub mod embedder;
pub mod error;
pub mod llm;
pub mod passage;

pub use config::{EmbeddingConfig, EmbeddingProvider, RagConfig};
pub use document_store::{
    DocumentStore, SourceFilter, SourcePattern, StoreStats, JSON_SOURCE_PATTERN,
    PDF_SOURCE_PATTERN, TEXT_SOURCE_PATTERN,
};
pub use embedder::{check_embedding, Embedder};
pub use error::{Error, Result};
pub use llm::LLMProvider;
pub use passage::{
    Answer, DocumentPage, MatchKind, PassageRecord, ScoredPassage, UploadedFile,
};
