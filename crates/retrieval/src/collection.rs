//! In-memory vector collection.
//!
//! Records live in insertion order inside a `tokio::sync::RwLock`, so
//! nearest-neighbor ties resolve deterministically to the earlier
//! insert. Re-indexing is `clear` + `upsert`; concurrent queries see
//! either the old or the new set, never a torn one.

use async_trait::async_trait;
use blotter_core::collection::{IndexedRecord, ScoredRecord, VectorCollection};
use blotter_core::error::RetrievalError;
use tokio::sync::RwLock;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal.
/// Returns 0.0 if either vector is zero-length, empty, or mismatched.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

pub struct InMemoryCollection {
    name: String,
    dimension: usize,
    records: RwLock<Vec<IndexedRecord>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            records: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, record: IndexedRecord) -> Result<(), RetrievalError> {
        if record.vector.len() != self.dimension {
            return Err(RetrievalError::IndexFailed(format!(
                "collection '{}' expects dimension {}, got {}",
                self.name,
                self.dimension,
                record.vector.len()
            )));
        }

        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn nearest(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, RetrievalError> {
        let records = self.records.read().await;

        let mut scored: Vec<ScoredRecord> = records
            .iter()
            .map(|record| ScoredRecord {
                // Negative cosine carries no retrieval signal here,
                // so similarity is clamped into [0, 1].
                similarity: cosine_similarity(&record.vector, vector).clamp(0.0, 1.0),
                record: record.clone(),
            })
            .collect();

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.records.read().await.len())
    }

    async fn clear(&self) -> Result<(), RetrievalError> {
        self.records.write().await.clear();
        Ok(())
    }
}
