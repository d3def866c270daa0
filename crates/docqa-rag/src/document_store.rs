//! Local document store
//!
//! Records live in memory behind a lock. When a path is configured, every
//! mutation is first written to a JSON file and only then applied in memory,
//! so a failed write leaves both unchanged. File writes go to a temp file in
//! the same directory and are renamed into place, so a crash never leaves a
//! half-written store behind.
//!
//! Vector search is an exact brute-force scan: the dot product of the query
//! with every stored embedding, O(N·D) per query. That is fine for hundreds
//! to a few thousand passages; beyond that an approximate nearest-neighbour
//! index should implement `DocumentStore` instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tempfile::NamedTempFile;

use docqa_core::{
    check_embedding, DocumentStore, Error, MatchKind, PassageRecord, Result, ScoredPassage,
    SourceFilter, SourcePattern,
};

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<Arc<PassageRecord>>,
    /// Pinned by configuration or by the first insert
    dimension: Option<usize>,
}

/// On-disk layout
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile<R> {
    dimension: Option<usize>,
    records: Vec<R>,
}

/// In-memory passage store with optional JSON file durability
pub struct LocalDocumentStore {
    state: RwLock<StoreState>,
    configured_dimension: Option<usize>,
    path: Option<PathBuf>,
    /// Serialises mutations so snapshots reach disk in order
    persist_lock: tokio::sync::Mutex<()>,
}

impl LocalDocumentStore {
    /// Create a store that keeps records in memory only
    pub fn in_memory() -> Self {
        Self::build(None, None, StoreState::default())
    }

    /// In-memory store whose embedding dimension is fixed up front
    pub fn with_dimension(dimension: usize) -> Self {
        Self::build(
            None,
            Some(dimension),
            StoreState {
                records: Vec::new(),
                dimension: Some(dimension),
            },
        )
    }

    /// Open (or create) a store persisted at `path`
    pub async fn open(path: impl AsRef<Path>, dimension: Option<usize>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut state = StoreState {
            records: Vec::new(),
            dimension,
        };

        if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            let file: StoreFile<PassageRecord> = serde_json::from_str(&content)?;

            if let (Some(expected), Some(actual)) = (dimension, file.dimension) {
                if expected != actual {
                    return Err(Error::DimensionMismatch { expected, actual });
                }
            }

            state.dimension = dimension.or(file.dimension);
            state.records = file.records.into_iter().map(Arc::new).collect();
            tracing::info!(
                "Loaded {} passages from {}",
                state.records.len(),
                path.display()
            );
        }

        Ok(Self::build(Some(path), dimension, state))
    }

    fn build(path: Option<PathBuf>, configured_dimension: Option<usize>, state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
            configured_dimension,
            path,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Embedding dimension records must have, once known
    pub fn dimension(&self) -> Result<Option<usize>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.dimension)
    }

    fn snapshot(&self) -> Result<(Vec<Arc<PassageRecord>>, Option<usize>)> {
        let state = self.state.read().map_err(lock_error)?;
        Ok((state.records.clone(), state.dimension))
    }

    /// Write `state` to disk, then make it current. Callers hold `persist_lock`,
    /// so memory only changes once the file reflects it.
    async fn commit(&self, next: StoreState) -> Result<()> {
        let next = match self.path.clone() {
            Some(path) => tokio::task::spawn_blocking(move || {
                write_store_file(&path, next.dimension, &next.records).map(|()| next)
            })
            .await
            .map_err(|e| Error::DocumentStore(format!("Persist task failed: {}", e)))??,
            None => next,
        };

        let mut state = self.state.write().map_err(lock_error)?;
        *state = next;
        Ok(())
    }
}

impl Default for LocalDocumentStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> Error {
    Error::DocumentStore(format!("Lock error: {}", e))
}

fn write_store_file(
    path: &Path,
    dimension: Option<usize>,
    records: &[Arc<PassageRecord>],
) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let file = StoreFile {
        dimension,
        records: records.iter().map(|record| record.as_ref()).collect::<Vec<_>>(),
    };

    let mut temp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer(&mut writer, &file)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Exact top-k by dot product. Ties keep insertion order.
pub fn brute_force_top_k(
    records: &[Arc<PassageRecord>],
    query: &[f32],
    k: usize,
) -> Result<Vec<ScoredPassage>> {
    let mut scored = Vec::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        if record.embedding.len() != query.len() {
            return Err(Error::DimensionMismatch {
                expected: record.embedding.len(),
                actual: query.len(),
            });
        }
        let score: f32 = record
            .embedding
            .iter()
            .zip(query)
            .map(|(a, b)| a * b)
            .sum();
        scored.push((score, position));
    }

    Ok(top_k(scored, k)
        .into_iter()
        .map(|(similarity, position)| ScoredPassage {
            record: records[position].as_ref().clone(),
            similarity,
            kind: MatchKind::Vector,
        })
        .collect())
}

/// Lexical relevance: share of distinct query terms that occur as whole words
pub fn lexical_top_k(records: &[Arc<PassageRecord>], query: &str, k: usize) -> Vec<ScoredPassage> {
    let terms: Vec<String> = {
        let mut seen = HashSet::new();
        words(query).filter(|term| seen.insert(term.clone())).collect()
    };
    if terms.is_empty() {
        return Vec::new();
    }

    let scored: Vec<(f32, usize)> = records
        .iter()
        .enumerate()
        .filter_map(|(position, record)| {
            let content: HashSet<String> = words(&record.content).collect();
            let matches = terms.iter().filter(|term| content.contains(*term)).count();
            (matches > 0).then(|| (matches as f32 / terms.len() as f32, position))
        })
        .collect();

    top_k(scored, k)
        .into_iter()
        .map(|(similarity, position)| ScoredPassage {
            record: records[position].as_ref().clone(),
            similarity,
            kind: MatchKind::Lexical,
        })
        .collect()
}

/// Lowercased alphanumeric words
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn top_k(mut scored: Vec<(f32, usize)>, k: usize) -> Vec<(f32, usize)> {
    let order = |a: &(f32, usize), b: &(f32, usize)| -> Ordering {
        b.0.total_cmp(&a.0).then(a.1.cmp(&b.1))
    };

    if k == 0 {
        return Vec::new();
    }
    if scored.len() > k {
        scored.select_nth_unstable_by(k - 1, order);
        scored.truncate(k);
    }
    scored.sort_by(order);
    scored
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn insert_many(&self, records: Vec<PassageRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let _guard = self.persist_lock.lock().await;
        let count = records.len();
        let (mut current, dimension) = self.snapshot()?;

        let expected = dimension.unwrap_or(records[0].embedding.len());
        for record in &records {
            check_embedding(&record.embedding, expected)?;
            if record.content.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Passage {} from '{}' has empty content",
                    record.id, record.source
                )));
            }
        }
        current.extend(records.into_iter().map(Arc::new));

        let next = StoreState {
            records: current,
            dimension: Some(expected),
        };
        if let Err(e) = self.commit(next).await {
            tracing::error!("Failed to persist {} inserted passages: {}", count, e);
            return Err(e);
        }

        tracing::debug!("Inserted {} passages", count);
        Ok(count)
    }

    async fn delete_by_source_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = SourcePattern::new(pattern)?;

        let _guard = self.persist_lock.lock().await;
        let (current, dimension) = self.snapshot()?;
        let before = current.len();
        let remaining: Vec<_> = current
            .into_iter()
            .filter(|record| !pattern.matches(&record.source))
            .collect();
        let removed = before - remaining.len();

        if removed > 0 {
            self.commit(StoreState {
                records: remaining,
                dimension,
            })
            .await?;
        }

        tracing::info!(
            "Deleted {} passages matching source pattern '{}'",
            removed,
            pattern.as_str()
        );
        Ok(removed)
    }

    async fn vector_search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
        if query_embedding.is_empty() {
            return Err(Error::DocumentStore("Empty query embedding".to_string()));
        }
        if query_embedding.iter().any(|value| !value.is_finite()) {
            return Err(Error::DocumentStore(
                "Query embedding contains non-finite values".to_string(),
            ));
        }

        let (records, dimension) = self.snapshot()?;
        if let Some(expected) = dimension {
            if expected != query_embedding.len() {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: query_embedding.len(),
                });
            }
        }

        let query = query_embedding.to_vec();
        tokio::task::spawn_blocking(move || brute_force_top_k(&records, &query, k))
            .await
            .map_err(|e| Error::DocumentStore(format!("Search task failed: {}", e)))?
    }

    async fn text_search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        let (records, _) = self.snapshot()?;
        let query = query.to_string();
        tokio::task::spawn_blocking(move || lexical_top_k(&records, &query, k))
            .await
            .map_err(|e| Error::DocumentStore(format!("Search task failed: {}", e)))
    }

    async fn count(&self, filter: &SourceFilter) -> Result<usize> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .records
            .iter()
            .filter(|record| filter.matches(&record.source))
            .count())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        self.commit(StoreState {
            records: Vec::new(),
            dimension: self.configured_dimension,
        })
        .await?;
        tracing::info!("Cleared document store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(id: &str, source: &str, content: &str, embedding: Vec<f32>) -> PassageRecord {
        PassageRecord {
            id: id.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            page: 0,
            embedding,
            created_at: Utc::now(),
        }
    }

    async fn seeded_store() -> LocalDocumentStore {
        let store = LocalDocumentStore::in_memory();
        store
            .insert_many(vec![
                record("a", "report-2023.pdf", "annual revenue figures", vec![1.0, 0.0, 0.0]),
                record("b", "Report-2024.pdf", "hiring plan for engineering", vec![0.6, 0.8, 0.0]),
                record("c", "notes.txt", "meeting notes about revenue", vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let store = seeded_store().await;
        assert_eq!(store.count(&SourceFilter::All).await.unwrap(), 3);
        assert_eq!(
            store.count(&SourceFilter::pattern("report").unwrap()).await.unwrap(),
            2
        );
        assert_eq!(store.dimension().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = seeded_store().await;
        let err = store
            .insert_many(vec![record("d", "x.txt", "short vector", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 1 }));
        assert_eq!(store.count(&SourceFilter::All).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_mixed_batch_rejected_whole() {
        let store = LocalDocumentStore::with_dimension(2);
        let result = store
            .insert_many(vec![
                record("a", "a.txt", "fine", vec![1.0, 0.0]),
                record("b", "b.txt", "broken", vec![1.0, 0.0, 0.0]),
            ])
            .await;
        assert!(result.is_err());
        assert_eq!(store.count(&SourceFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_vector_search_orders_by_dot_product() {
        let store = seeded_store().await;
        let results = store.vector_search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id, "a");
        assert_eq!(results[1].record.id, "b");
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
        assert!((results[1].similarity - 0.6).abs() < 1e-6);
        assert!(results.iter().all(|r| r.kind == MatchKind::Vector));
    }

    #[tokio::test]
    async fn test_vector_search_ties_keep_insertion_order() {
        let store = LocalDocumentStore::in_memory();
        store
            .insert_many(vec![
                record("first", "a.txt", "one", vec![0.5, 0.5]),
                record("second", "b.txt", "two", vec![0.5, 0.5]),
                record("third", "c.txt", "three", vec![0.5, 0.5]),
            ])
            .await
            .unwrap();
        let ids: Vec<String> = store
            .vector_search(&[1.0, 1.0], 3)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.record.id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_vector_search_rejects_wrong_dimension() {
        let store = seeded_store().await;
        assert!(store.vector_search(&[1.0, 0.0], 3).await.is_err());
        assert!(store.vector_search(&[], 3).await.is_err());
        assert!(store.vector_search(&[f32::NAN, 0.0, 0.0], 3).await.is_err());
    }

    #[tokio::test]
    async fn test_vector_search_empty_store() {
        let store = LocalDocumentStore::in_memory();
        assert!(store.vector_search(&[1.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_search() {
        let store = seeded_store().await;
        let results = store.text_search("Revenue notes", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id, "c");
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(results[1].record.id, "a");
        assert!(results.iter().all(|r| r.kind == MatchKind::Lexical));

        assert!(store.text_search("   ", 5).await.unwrap().is_empty());
        assert!(store.text_search("zebra", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_search_matches_whole_words_only() {
        let store = LocalDocumentStore::in_memory();
        store
            .insert_many(vec![
                record("a", "a.txt", "Concatenate the education records.", vec![1.0, 0.0]),
                record("b", "b.txt", "The cat sat on the mat.", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.text_search("cat", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "b");

        let results = store.text_search("a b c d e f g h i j alpha", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("passages.json");
        let store = LocalDocumentStore::open(&path, None).await.unwrap();
        store
            .insert_many(vec![
                record("a", "keep.txt", "kept passage", vec![1.0, 0.0]),
                record("b", "drop.txt", "dropped passage", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        // a directory in place of the store file makes the rename fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.delete_by_source_pattern("drop").await.is_err());
        assert_eq!(store.count(&SourceFilter::All).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_first_insert_leaves_dimension_unpinned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("passages.json");
        let store = LocalDocumentStore::open(&path, None).await.unwrap();
        std::fs::create_dir(&path).unwrap();

        let result = store
            .insert_many(vec![record("a", "a.txt", "three dims", vec![1.0, 0.0, 0.0])])
            .await;
        assert!(result.is_err());
        assert_eq!(store.count(&SourceFilter::All).await.unwrap(), 0);
        assert_eq!(store.dimension().unwrap(), None);

        std::fs::remove_dir(&path).unwrap();
        store
            .insert_many(vec![record("b", "b.txt", "two dims", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.dimension().unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_delete_by_source_pattern() {
        let store = seeded_store().await;
        let deleted = store.delete_by_source_pattern("REPORT").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(
            store.count(&SourceFilter::pattern("report").unwrap()).await.unwrap(),
            0
        );

        let results = store.vector_search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.source, "notes.txt");

        assert_eq!(store.delete_by_source_pattern("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = seeded_store().await;
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.pdf_documents, 2);
        assert_eq!(stats.json_documents, 0);
        assert_eq!(stats.text_documents, 1);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("passages.json");

        {
            let store = LocalDocumentStore::open(&path, None).await.unwrap();
            store
                .insert_many(vec![
                    record("a", "keep.txt", "kept passage", vec![1.0, 0.0]),
                    record("b", "drop.txt", "dropped passage", vec![0.0, 1.0]),
                ])
                .await
                .unwrap();
            store.delete_by_source_pattern("drop").await.unwrap();
        }

        let reopened = LocalDocumentStore::open(&path, None).await.unwrap();
        assert_eq!(reopened.count(&SourceFilter::All).await.unwrap(), 1);
        assert_eq!(reopened.dimension().unwrap(), Some(2));
        let results = reopened.vector_search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].record.content, "kept passage");

        let err = LocalDocumentStore::open(&path, Some(3)).await.err().unwrap();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn test_clear_keeps_configured_dimension() {
        let store = LocalDocumentStore::with_dimension(2);
        store
            .insert_many(vec![record("a", "a.txt", "content", vec![1.0, 0.0])])
            .await
            .unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count(&SourceFilter::All).await.unwrap(), 0);
        assert_eq!(store.dimension().unwrap(), Some(2));
    }

    #[test]
    fn test_top_k_selection() {
        let scored = vec![(0.1, 0), (0.9, 1), (0.5, 2), (0.9, 3), (0.3, 4)];
        assert_eq!(top_k(scored.clone(), 3), vec![(0.9, 1), (0.9, 3), (0.5, 2)]);
        assert!(top_k(scored, 0).is_empty());
    }
}
