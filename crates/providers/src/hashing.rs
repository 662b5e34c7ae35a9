//! Deterministic feature-hashing embedder.
//!
//! Produces embeddings with no network dependency: each token is hashed
//! into one of `dimension` buckets with a sign bit, then the vector is
//! l2-normalized. Identical texts embed identically and texts sharing
//! tokens land close together, which is exactly what indexing and
//! retrieval tests need. Not a semantic model; the default deployment
//! uses the OpenAI-compatible provider instead.

use async_trait::async_trait;
use blotter_core::error::ProviderError;
use blotter_core::provider::CompletionProvider;
use std::hash::Hasher;
use twox_hash::XxHash64;

const HASH_SEED: u64 = 0x5eed;

/// Embed-only provider backed by token feature hashing.
pub struct FeatureHashEmbedder {
    dimension: usize,
}

impl FeatureHashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn token_hash(token: &str) -> u64 {
        let mut hasher = XxHash64::with_seed(HASH_SEED);
        hasher.write(token.as_bytes());
        hasher.finish()
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = Self::token_hash(token);
            let index = (hash % self.dimension as u64) as usize;
            // One hash bit decides the sign, so unrelated tokens sharing
            // a bucket tend to cancel instead of compounding.
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for FeatureHashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl CompletionProvider for FeatureHashEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(
            "hashing provider is embed-only".into(),
        ))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
