//! File-backed document index using JSONL storage.
//!
//! Each line of the file is a JSON-encoded [`Document`]. The file is loaded
//! into an [`InMemoryStore`] on open and rewritten in full whenever
//! ingestion adds documents. Queries never touch the disk.
//!
//! Storage location: `~/.nugget/documents.jsonl` unless configured.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nugget_core::document::{DocumentStore, RetrievedPassage};
use nugget_core::error::StoreError;
use tracing::{debug, warn};

use crate::in_memory::{Document, InMemoryStore};

pub struct FileStore {
    path: PathBuf,
    index: InMemoryStore,
}

impl FileStore {
    /// Open the document file at `path`.
    ///
    /// A missing file opens an empty index (the file is created on first
    /// write). Lines that fail to parse are skipped with a warning.
    pub async fn open(path: impl Into<PathBuf>, min_score: f32) -> Self {
        let path = path.into();
        let index = InMemoryStore::with_min_score(min_score);
        let documents = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = documents.len(), "Document file loaded");
        for document in documents {
            index.upsert(document).await;
        }
        Self { path, index }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<Document> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read document file, starting empty");
                return Vec::new();
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Document>(line) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted document line");
                    None
                }
            })
            .collect()
    }

    /// Insert or replace documents, then rewrite the file.
    pub async fn upsert_all(&self, documents: Vec<Document>) -> Result<usize, StoreError> {
        let added = documents.len();
        for document in documents {
            self.index.upsert(document).await;
        }
        self.flush().await?;
        Ok(added)
    }

    /// Remove every document and truncate the file.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.index.clear().await;
        self.flush().await
    }

    async fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create document directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for document in self.index.documents().await {
            let line = serde_json::to_string(&document).map_err(|e| {
                StoreError::Storage(format!("Failed to serialize document: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, content)
            .map_err(|e| StoreError::Storage(format!("Failed to write document file: {e}")))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedPassage>, StoreError> {
        self.index.query(text, top_k).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.index.count().await
    }
}
