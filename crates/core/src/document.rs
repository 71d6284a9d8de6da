//! Document store trait: read-only similarity search over restaurant facts.
//!
//! The answering pipeline only ever reads from the index. Writing (the
//! one-time ingestion of scraped restaurant records) happens through the
//! concrete store types, never through this trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// A passage returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Stable identifier of the source document (e.g. "restaurant_2")
    pub id: String,

    /// The passage text
    pub text: String,

    /// Source metadata (restaurant name, kind, hours, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Similarity score set by the query, higher is more relevant
    #[serde(default)]
    pub score: f32,
}

impl RetrievedPassage {
    /// The restaurant name, if the metadata carries one.
    pub fn source_name(&self) -> Option<&str> {
        self.metadata.get("name").map(String::as_str)
    }
}

/// The document store boundary.
///
/// Implementations: in-memory index, JSONL-file-backed index.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "file").
    fn name(&self) -> &str;

    /// Return at most `top_k` passages ranked by relevance, most relevant
    /// first. An empty result means "no grounding available" and is not an
    /// error.
    async fn query(&self, text: &str, top_k: usize) -> std::result::Result<Vec<RetrievedPassage>, StoreError>;

    /// Number of indexed documents.
    async fn count(&self) -> std::result::Result<usize, StoreError>;
}
