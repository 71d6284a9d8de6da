//! In-memory document index.
//!
//! Each document is embedded once on upsert; queries embed the query text
//! and rank every document by cosine similarity.

use std::collections::BTreeMap;

use async_trait::async_trait;
use nugget_core::document::{DocumentStore, RetrievedPassage};
use nugget_core::error::StoreError;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::vector::{DEFAULT_DIMENSIONS, cosine_similarity, embed};

/// Minimum similarity a passage needs to be returned.
pub const DEFAULT_MIN_SCORE: f32 = 0.05;

/// A document as written by ingestion and read back by the file backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct IndexedDocument {
    document: Document,
    embedding: Vec<f32>,
}

/// An in-memory, read-mostly document index.
pub struct InMemoryStore {
    documents: RwLock<Vec<IndexedDocument>>,
    min_score: f32,
    dims: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_min_score(DEFAULT_MIN_SCORE)
    }

    pub fn with_min_score(min_score: f32) -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            min_score,
            dims: DEFAULT_DIMENSIONS,
        }
    }

    /// Insert a document, replacing any existing one with the same id.
    pub async fn upsert(&self, document: Document) {
        let embedding = embed(&document.text, self.dims);
        let mut documents = self.documents.write().await;
        let indexed = IndexedDocument { document, embedding };
        match documents.iter_mut().find(|d| d.document.id == indexed.document.id) {
            Some(existing) => *existing = indexed,
            None => documents.push(indexed),
        }
    }

    /// All documents in insertion order.
    pub async fn documents(&self) -> Vec<Document> {
        self.documents
            .read()
            .await
            .iter()
            .map(|d| d.document.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedPassage>, StoreError> {
        let query_embedding = embed(text, self.dims);
        let documents = self.documents.read().await;

        let mut scored: Vec<RetrievedPassage> = documents
            .iter()
            .filter_map(|d| {
                let score = cosine_similarity(&d.embedding, &query_embedding);
                (score >= self.min_score).then(|| RetrievedPassage {
                    id: d.document.id.clone(),
                    text: d.document.text.clone(),
                    metadata: d.document.metadata.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        debug!(query = text, hits = scored.len(), "Document query");
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.documents.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, name: &str, text: &str) -> Document {
        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), name.to_string());
        Document {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .upsert(doc(
                "restaurant_1",
                "KFC",
                "Name: KFC\nLocations:\n- Shahjahan Road, Lucknow\nMenu Items:\n- Zinger Burger (₹ 199)\n- Hot Wings (₹ 149)",
            ))
            .await;
        store
            .upsert(doc(
                "restaurant_3",
                "Tunday Kababi",
                "Name: Tunday Kababi\nMenu Items:\n- Galouti Kebab\n- Mutton Biryani\n- Ulte Tawe ka Paratha",
            ))
            .await;
        store
    }

    #[tokio::test]
    async fn query_ranks_most_relevant_first() {
        let store = seeded().await;
        let results = store.query("Where is KFC located?", 4).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].id, "restaurant_1");
        assert_eq!(results[0].source_name(), Some("KFC"));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn unrelated_query_returns_empty() {
        let store = seeded().await;
        let results = store.query("What is the capital of France?", 4).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn top_k_limits_results() {
        let store = seeded().await;
        let results = store.query("KFC Tunday Kababi kebab burger", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = seeded().await;
        store
            .upsert(doc("restaurant_1", "KFC", "Name: KFC\nHours: 11am - 11pm"))
            .await;
        assert_eq!(store.count().await.unwrap(), 2);

        let docs = store.documents().await;
        assert_eq!(docs[0].text, "Name: KFC\nHours: 11am - 11pm");

        store.clear().await;
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_store_returns_empty() {
        let store = InMemoryStore::new();
        assert!(store.query("biryani", 4).await.unwrap().is_empty());
        assert_eq!(store.name(), "in_memory");
    }
}
