//! Configuration loading, validation, and management for Blotter.
//!
//! Loads configuration from `~/.blotter/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.blotter/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion/embedding provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Hybrid retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Conversation context bounds
    #[serde(default)]
    pub context: ContextConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Trade-ledger storage configuration
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("retrieval", &self.retrieval)
            .field("context", &self.context)
            .field("gateway", &self.gateway)
            .field("ledger", &self.ledger)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind: "openai", "hashing", or "null"
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    /// Base URL for OpenAI-compatible endpoints
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Completion model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensionality (fixed per deployment)
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_kind() -> String {
    "openai".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_dimension() -> usize {
    1536
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_url: default_api_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            dimension: default_dimension(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Confidence level: "off", "lowest", "low", "high", "highest"
    #[serde(default = "default_confidence_level")]
    pub confidence_level: String,

    /// Per-collection overrides of the confidence level
    #[serde(default)]
    pub collection_confidence: HashMap<String, String>,

    /// Citation display: -1 = all, 0 = none, N = top N
    #[serde(default = "default_citations_shown")]
    pub citations_shown: i32,

    /// Maximum documents returned per search
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,

    /// Chunk size in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Fraction of the chunk size carried over as overlap
    #[serde(default = "default_overlap_fraction")]
    pub overlap_fraction: f32,

    /// Reply used when every result falls below the threshold
    #[serde(default = "default_idk_message")]
    pub idk_message: String,

    /// Whether to rewrite follow-up queries using history
    #[serde(default = "default_true")]
    pub query_rewrite: bool,
}

fn default_confidence_level() -> String {
    "low".into()
}
fn default_citations_shown() -> i32 {
    3
}
fn default_max_documents() -> usize {
    10
}
fn default_chunk_size() -> usize {
    512
}
fn default_overlap_fraction() -> f32 {
    0.1
}
fn default_idk_message() -> String {
    "I don't have enough reliable information to answer that.".into()
}
fn default_true() -> bool {
    true
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            confidence_level: default_confidence_level(),
            collection_confidence: HashMap::new(),
            citations_shown: default_citations_shown(),
            max_documents: default_max_documents(),
            chunk_size: default_chunk_size(),
            overlap_fraction: default_overlap_fraction(),
            idk_message: default_idk_message(),
            query_rewrite: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Turns kept per conversation (oldest evicted first)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Conversations kept in memory (oldest-touched evicted first)
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,

    /// Idle minutes before a conversation is dropped
    #[serde(default = "default_idle_timeout_minutes")]
    pub idle_timeout_minutes: u64,
}

fn default_max_turns() -> usize {
    10
}
fn default_max_conversations() -> usize {
    64
}
fn default_idle_timeout_minutes() -> u64 {
    30
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_conversations: default_max_conversations(),
            idle_timeout_minutes: default_idle_timeout_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8900
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path to the blotter CSV file
    #[serde(default = "default_ledger_path")]
    pub csv_path: String,
}

fn default_ledger_path() -> String {
    "blotter.csv".into()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            csv_path: default_ledger_path(),
        }
    }
}

const CONFIDENCE_LEVELS: [&str; 5] = ["off", "lowest", "low", "high", "highest"];

impl AppConfig {
    /// Load configuration from the default path (~/.blotter/config.toml).
    ///
    /// Also checks environment variables:
    /// - `BLOTTER_API_KEY` (falls back to `OPENAI_API_KEY`)
    /// - `BLOTTER_PROVIDER`, `BLOTTER_MODEL`
    /// - `BLOTTER_CONFIDENCE`, `BLOTTER_LEDGER_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("BLOTTER_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(kind) = std::env::var("BLOTTER_PROVIDER") {
            config.provider.kind = kind;
        }
        if let Ok(model) = std::env::var("BLOTTER_MODEL") {
            config.provider.model = model;
        }
        if let Ok(level) = std::env::var("BLOTTER_CONFIDENCE") {
            config.retrieval.confidence_level = level;
        }
        if let Ok(path) = std::env::var("BLOTTER_LEDGER_PATH") {
            config.ledger.csv_path = path;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".blotter")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !CONFIDENCE_LEVELS.contains(&self.retrieval.confidence_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown confidence_level '{}', expected one of {:?}",
                self.retrieval.confidence_level, CONFIDENCE_LEVELS
            )));
        }
        for (collection, level) in &self.retrieval.collection_confidence {
            if !CONFIDENCE_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "unknown confidence_level '{level}' for collection '{collection}'"
                )));
            }
        }
        if self.retrieval.citations_shown < -1 {
            return Err(ConfigError::ValidationError(
                "citations_shown must be -1 (all), 0 (none), or a positive count".into(),
            ));
        }
        if self.retrieval.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be at least 1 word".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.retrieval.overlap_fraction) {
            return Err(ConfigError::ValidationError(
                "overlap_fraction must be in [0.0, 1.0)".into(),
            ));
        }
        if self.context.max_turns == 0 || self.context.max_conversations == 0 {
            return Err(ConfigError::ValidationError(
                "context bounds must be at least 1".into(),
            ));
        }
        if self.provider.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "provider dimension must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `blotter config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            gateway: GatewayConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for blotter_core::Error {
    fn from(err: ConfigError) -> Self {
        blotter_core::Error::Config {
            message: err.to_string(),
        }
    }
}
