//! Provider implementations for Blotter.
//!
//! All providers implement the `blotter_core::CompletionProvider` trait.
//! `from_config` selects the right one at startup.

pub mod hashing;
pub mod null;
pub mod openai_compat;

pub use hashing::FeatureHashEmbedder;
pub use null::NullProvider;
pub use openai_compat::OpenAiCompatProvider;

use blotter_config::AppConfig;
use blotter_core::CompletionProvider;
use blotter_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;

/// Build the provider named in the configuration.
///
/// "openai" without an API key degrades to the null provider rather
/// than failing startup.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    match config.provider.kind.as_str() {
        "openai" => match &config.api_key {
            Some(key) => Ok(Arc::new(OpenAiCompatProvider::new(
                &config.provider.api_url,
                key,
                &config.provider.model,
                &config.provider.embedding_model,
                config.provider.dimension,
                Duration::from_secs(config.provider.timeout_secs),
            )?)),
            None => {
                tracing::warn!("No API key configured; provider calls will degrade gracefully");
                Ok(Arc::new(NullProvider))
            }
        },
        "hashing" => Ok(Arc::new(FeatureHashEmbedder::new(config.provider.dimension))),
        "null" => Ok(Arc::new(NullProvider)),
        other => Err(ProviderError::NotConfigured(format!(
            "unknown provider kind '{other}'"
        ))),
    }
}
