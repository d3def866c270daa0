//! Document store trait and types

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{Error, PassageRecord, Result, ScoredPassage};

/// Case-insensitive pattern matched anywhere in a record's `source`.
///
/// The pattern is interpreted as a regular expression; when it does not
/// compile it is matched as a literal substring instead.
#[derive(Debug, Clone)]
pub struct SourcePattern {
    raw: String,
    regex: Regex,
}

impl SourcePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                RegexBuilder::new(&regex::escape(pattern))
                    .case_insensitive(true)
                    .build()
            })
            .map_err(|e| Error::InvalidInput(format!("Invalid source pattern '{}': {}", pattern, e)))?;

        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Pattern as supplied by the caller
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, source: &str) -> bool {
        self.regex.is_match(source)
    }
}

/// Which records a count applies to
#[derive(Debug, Clone)]
pub enum SourceFilter {
    All,
    Pattern(SourcePattern),
}

impl SourceFilter {
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(SourceFilter::Pattern(SourcePattern::new(pattern)?))
    }

    pub fn matches(&self, source: &str) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Pattern(pattern) => pattern.matches(source),
        }
    }
}

/// Passage counts reported by the stats entrypoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_documents: usize,
    pub pdf_documents: usize,
    pub json_documents: usize,
    pub text_documents: usize,
}

/// Source patterns used to break `StoreStats` down by document type
pub const PDF_SOURCE_PATTERN: &str = r"\.pdf$";
pub const JSON_SOURCE_PATTERN: &str = r"\.json$";
pub const TEXT_SOURCE_PATTERN: &str = r"\.(txt|md|markdown|html?)$";

/// Trait for durable passage storage with similarity search.
///
/// `vector_search` is the seam where a brute-force scan can be swapped for
/// an approximate nearest-neighbour index without touching retrieval code.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist all records, returning how many were inserted
    async fn insert_many(&self, records: Vec<PassageRecord>) -> Result<usize>;

    /// Remove every record whose source matches `pattern` (case-insensitive)
    async fn delete_by_source_pattern(&self, pattern: &str) -> Result<usize>;

    /// Top `k` records by dot product with `query_embedding`, highest first
    async fn vector_search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredPassage>>;

    /// Top `k` records by lexical match against `query`, highest first
    async fn text_search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>>;

    /// Number of records matching `filter`
    async fn count(&self, filter: &SourceFilter) -> Result<usize>;

    /// Remove every record
    async fn clear(&self) -> Result<()>;

    /// Total and per-type record counts
    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            total_documents: self.count(&SourceFilter::All).await?,
            pdf_documents: self.count(&SourceFilter::pattern(PDF_SOURCE_PATTERN)?).await?,
            json_documents: self.count(&SourceFilter::pattern(JSON_SOURCE_PATTERN)?).await?,
            text_documents: self.count(&SourceFilter::pattern(TEXT_SOURCE_PATTERN)?).await?,
        })
    }
}
