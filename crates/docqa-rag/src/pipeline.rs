//! Ingestion pipeline: uploaded files → stored passages

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use docqa_core::{
    check_embedding, DocumentPage, DocumentStore, Embedder, Error, PassageRecord, RagConfig,
    Result, UploadedFile,
};

use crate::chunker::Chunker;
use crate::loader::{self, DocumentFormat};
use crate::staging::{StagedFile, StagingArea};

/// Counts for one ingestion request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub files: usize,
    pub pages: usize,
    pub chunks: usize,
    pub inserted: usize,
}

pub struct IngestionPipeline {
    staging: StagingArea,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
}

impl IngestionPipeline {
    pub fn new(
        staging: StagingArea,
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            staging,
            chunker,
            embedder,
            store,
        }
    }

    pub fn from_config(
        config: &RagConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        Ok(Self::new(
            StagingArea::new(&config.staging_dir),
            Chunker::from_config(config)?,
            embedder,
            store,
        ))
    }

    /// Stage, parse, chunk, embed and store every file.
    ///
    /// Any failure aborts the request before anything is inserted.
    pub async fn ingest(&self, files: Vec<UploadedFile>) -> Result<IngestionReport> {
        for file in &files {
            DocumentFormat::from_path(&file.filename)?;
        }

        let mut report = IngestionReport {
            files: files.len(),
            ..IngestionReport::default()
        };

        let mut pages = Vec::new();
        for file in &files {
            let staged = self.staging.stage(file).await?;
            let loaded = load_staged(staged).await?;
            tracing::info!("Loaded {} page(s) from {}", loaded.len(), file.filename);
            pages.extend(loaded);
        }
        report.pages = pages.len();

        let chunks: Vec<(&DocumentPage, &str)> = pages
            .iter()
            .flat_map(|page| self.chunker.chunk_page(page))
            .map(|chunk| (chunk.page, chunk.content))
            .collect();
        report.chunks = chunks.len();

        if chunks.is_empty() {
            tracing::warn!("No text extracted from {} file(s)", report.files);
            return Ok(report);
        }

        let texts: Vec<String> = chunks.iter().map(|(_, content)| content.to_string()).collect();
        tracing::debug!("Embedding {} chunks...", texts.len());
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        let dimension = self.embedder.dimension();
        let created_at = Utc::now();
        let records = chunks
            .into_iter()
            .zip(texts)
            .zip(embeddings)
            .map(|(((page, _), content), embedding)| {
                check_embedding(&embedding, dimension)?;
                Ok(PassageRecord {
                    id: Uuid::new_v4().to_string(),
                    content,
                    source: page.source.clone(),
                    page: page.page,
                    embedding,
                    created_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        report.inserted = self.store.insert_many(records).await?;
        tracing::info!(
            "Ingested {} file(s): {} page(s), {} chunk(s), {} passage(s) stored",
            report.files,
            report.pages,
            report.chunks,
            report.inserted
        );
        Ok(report)
    }

    /// Read files from disk and ingest them under their file names
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestionReport> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                Error::Ingestion(format!("Failed to read {}: {}", path.display(), e))
            })?;
            files.push(UploadedFile::new(file_name(path), bytes));
        }
        self.ingest(files).await
    }
}

async fn load_staged(staged: StagedFile) -> Result<Vec<DocumentPage>> {
    tokio::task::spawn_blocking(move || loader::load_file(&staged.path, &staged.original_name))
        .await
        .map_err(|e| Error::Ingestion(format!("Document loading task failed: {}", e)))?
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
