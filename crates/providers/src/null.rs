//! Null provider — the graceful-degradation backend.
//!
//! Every call fails with `NotConfigured`. Wired in when no API key is
//! present so best-effort callers (the query rewriter, free-text entity
//! extraction) fall back to their deterministic paths instead of the
//! process refusing to start.

use async_trait::async_trait;
use blotter_core::error::ProviderError;
use blotter_core::provider::CompletionProvider;

pub struct NullProvider;

#[async_trait]
impl CompletionProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(
            "no completion provider configured".into(),
        ))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_calls_fail_gracefully() {
        let provider = NullProvider;
        assert!(matches!(
            provider.complete("hi").await,
            Err(ProviderError::NotConfigured(_))
        ));
        assert!(matches!(
            provider.embed("hi").await,
            Err(ProviderError::NotConfigured(_))
        ));
        assert!(!provider.health_check().await.unwrap());
    }
}
