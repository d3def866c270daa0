//! Passage records and the values that flow between ingestion and retrieval

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored chunk of a source document with its embedding attached.
///
/// Records are immutable once inserted; they are only ever removed by
/// deleting every record whose `source` matches a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageRecord {
    pub id: String,
    pub content: String,
    pub source: String,
    /// Page within `source`, `0` when the document is not paginated.
    pub page: u32,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl PassageRecord {
    /// Attribution label used in answers: `"<source> (page <n>)"`, or just the
    /// source when the page is unknown.
    pub fn attribution(&self) -> String {
        if self.page != 0 {
            format!("{} (page {})", self.source, self.page)
        } else {
            self.source.clone()
        }
    }
}

/// How a passage was matched to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Dot product against the query embedding
    Vector,
    /// Lexical term overlap, used when vector search is unavailable
    Lexical,
}

/// A passage paired with its per-query score. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub record: PassageRecord,
    pub similarity: f32,
    pub kind: MatchKind,
}

impl ScoredPassage {
    pub fn content(&self) -> &str {
        &self.record.content
    }

    pub fn source(&self) -> &str {
        &self.record.source
    }

    pub fn page(&self) -> u32 {
        self.record.page
    }
}

/// Text extracted from one page of an uploaded document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub source: String,
    pub page: u32,
    pub text: String,
}

impl DocumentPage {
    pub fn new(source: impl Into<String>, page: u32, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page,
            text: text.into(),
        }
    }
}

/// A raw uploaded document blob
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Response returned on the question answering path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub response: String,
    pub sources: Vec<String>,
}
