//! CompletionProvider trait — the abstraction over the external
//! text-generation and embedding collaborators.
//!
//! The retrieval engine and the handlers call `complete()` / `embed()`
//! without knowing which backend is wired in: an HTTP endpoint, a
//! deterministic local embedder, or the null provider that makes every
//! best-effort call degrade gracefully.

use async_trait::async_trait;

use crate::error::ProviderError;

/// The core provider trait.
///
/// `complete` is used for query rewriting and free-text entity
/// extraction; `embed` feeds the vector collections. Both are treated
/// as opaque collaborators: callers must tolerate failure.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "null").
    fn name(&self) -> &str;

    /// Complete a prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError>;

    /// Embed a text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let _ = text;
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support embeddings",
            self.name()
        )))
    }

    /// The embedding dimensionality this provider produces.
    ///
    /// Fixed per deployment; every stored vector must match it.
    fn dimension(&self) -> usize {
        0
    }

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
