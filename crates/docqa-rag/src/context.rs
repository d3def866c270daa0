//! Context assembly for answer generation

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use docqa_core::{RagConfig, ScoredPassage};

/// Separator appended after every passage excerpt
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Context text plus the attributions of the passages it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub context: String,
    /// Deduplicated, sorted `"<source>"` / `"<source> (page N)"` labels
    pub sources: Vec<String>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Turns ranked passages into a bounded prompt context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    max_chars_per_passage: usize,
}

impl ContextAssembler {
    pub fn new(max_chars_per_passage: usize) -> Self {
        Self {
            max_chars_per_passage,
        }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.context_chars_per_passage)
    }

    /// Concatenate the first `max_chars_per_passage` characters of each
    /// passage, in rank order, each followed by a blank line.
    ///
    /// Passages with an empty source still contribute text but no attribution.
    pub fn assemble(&self, passages: &[ScoredPassage]) -> AssembledContext {
        let mut context = String::new();
        let mut sources = BTreeSet::new();

        for passage in passages {
            context.push_str(truncate_chars(passage.content(), self.max_chars_per_passage));
            context.push_str(PASSAGE_SEPARATOR);

            if !passage.source().is_empty() {
                sources.insert(passage.record.attribution());
            }
        }

        AssembledContext {
            context,
            sources: sources.into_iter().collect(),
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(500)
    }
}

/// Longest prefix of `s` with at most `max` characters
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docqa_core::{MatchKind, PassageRecord};

    fn passage(content: &str, source: &str, page: u32) -> ScoredPassage {
        ScoredPassage {
            record: PassageRecord {
                id: format!("{}-{}", source, page),
                content: content.to_string(),
                source: source.to_string(),
                page,
                embedding: vec![1.0],
                created_at: Utc::now(),
            },
            similarity: 0.9,
            kind: MatchKind::Vector,
        }
    }

    #[test]
    fn test_truncates_each_passage() {
        let assembler = ContextAssembler::default();
        let long = "x".repeat(1200);
        let assembled = assembler.assemble(&[passage(&long, "a.txt", 0)]);
        assert_eq!(assembled.context, format!("{}\n\n", "x".repeat(500)));
    }

    #[test]
    fn test_truncation_counts_characters() {
        let assembler = ContextAssembler::new(3);
        let assembled = assembler.assemble(&[passage("éèêë", "a.txt", 0)]);
        assert_eq!(assembled.context, "éèê\n\n");
    }

    #[test]
    fn test_sources_are_deduplicated() {
        let assembler = ContextAssembler::default();
        let assembled = assembler.assemble(&[
            passage("one", "report.pdf", 2),
            passage("two", "report.pdf", 2),
            passage("three", "report.pdf", 3),
        ]);
        assert_eq!(
            assembled.sources,
            vec!["report.pdf (page 2)", "report.pdf (page 3)"]
        );
    }

    #[test]
    fn test_empty_source_contributes_text_only() {
        let assembler = ContextAssembler::default();
        let assembled = assembler.assemble(&[passage("orphan text", "", 1)]);
        assert_eq!(assembled.context, "orphan text\n\n");
        assert!(assembled.sources.is_empty());
    }

    #[test]
    fn test_no_passages() {
        let assembled = ContextAssembler::default().assemble(&[]);
        assert!(assembled.is_empty());
        assert!(assembled.sources.is_empty());
    }

    #[test]
    fn test_assembled_context_snapshot() {
        let assembler = ContextAssembler::new(12);
        let assembled = assembler.assemble(&[
            passage("Revenue rose 12% in Q3 thanks to exports.", "q3.pdf", 4),
            passage("Headcount stayed flat.", "notes.txt", 0),
        ]);
        insta::assert_json_snapshot!(assembled, @r###"
        {
          "context": "Revenue rose\n\nHeadcount st\n\n",
          "sources": [
            "notes.txt",
            "q3.pdf (page 4)"
          ]
        }
        "###);
    }
}
