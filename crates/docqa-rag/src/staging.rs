//! Staging area for uploaded files
//!
//! Uploads are written to disk before parsing. Each upload gets its own
//! directory named by a fresh UUID, so two uploads with the same file name
//! (concurrent or not) never overwrite each other.

use std::path::PathBuf;
use uuid::Uuid;

use docqa_core::{Error, Result, UploadedFile};

/// A file written to the staging area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub upload_id: Uuid,
    /// Name as uploaded; used as the passage source
    pub original_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `file` to `<root>/<upload-uuid>/<sanitised name>`
    pub async fn stage(&self, file: &UploadedFile) -> Result<StagedFile> {
        let upload_id = Uuid::new_v4();
        let dir = self.root.join(upload_id.to_string());
        let path = dir.join(sanitize_file_name(&file.filename));

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            Error::Ingestion(format!(
                "Failed to create staging directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        tokio::fs::write(&path, &file.bytes).await.map_err(|e| {
            Error::Ingestion(format!("Failed to stage {}: {}", file.filename, e))
        })?;

        tracing::debug!(
            "Staged {} ({} bytes) at {}",
            file.filename,
            file.bytes.len(),
            path.display()
        );

        Ok(StagedFile {
            upload_id,
            original_name: file.filename.clone(),
            path,
        })
    }
}

/// Last path component of `name` with anything outside `[A-Za-z0-9._-]`
/// replaced by `_`. Never empty and never `.` / `..`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
