//! VectorCollection trait — per-domain partitions of indexed records.
//!
//! Each collection (trades, communications, policy documents) stores
//! `(vector, text, metadata)` triples and answers nearest-neighbor
//! queries by cosine similarity. Implementations: in-memory (default),
//! or any external vector store adapted behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A record stored in a vector collection.
///
/// Created at index time from a chunk plus domain metadata; immutable
/// once stored; replaced only by explicit re-index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedRecord {
    /// Unique ID within the collection
    pub id: String,

    /// Embedding vector (fixed dimensionality per deployment)
    pub vector: Vec<f32>,

    /// The indexed text
    pub text: String,

    /// Structured metadata (client, ticker, subject, source, ...)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl IndexedRecord {
    /// Fetch a metadata field as a string, empty if absent.
    pub fn meta_str(&self, key: &str) -> &str {
        self.metadata.get(key).and_then(|v| v.as_str()).unwrap_or("")
    }
}

/// A record paired with its similarity to a query vector.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: IndexedRecord,
    /// Cosine similarity clamped to [0, 1]
    pub similarity: f32,
}

/// The core collection trait.
#[async_trait]
pub trait VectorCollection: Send + Sync {
    /// The collection name (e.g., "trades", "communications", "policy").
    fn name(&self) -> &str;

    /// Insert or replace a record by ID.
    ///
    /// Implementations must reject vectors whose length differs from
    /// the collection's configured dimensionality.
    async fn upsert(&self, record: IndexedRecord) -> std::result::Result<(), RetrievalError>;

    /// Nearest-neighbor search by cosine similarity, best first.
    async fn nearest(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> std::result::Result<Vec<ScoredRecord>, RetrievalError>;

    /// Number of stored records.
    async fn count(&self) -> std::result::Result<usize, RetrievalError>;

    /// Remove all records (re-index entry point).
    async fn clear(&self) -> std::result::Result<(), RetrievalError>;
}
