//! Error types for the Blotter domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Blotter operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Handler errors ---
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    // --- Ledger errors ---
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // --- Conversation context errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection query failed in '{collection}': {reason}")]
    CollectionQueryFailed { collection: String, reason: String },

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Index write failed: {0}")]
    IndexFailed(String),
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("No handler matched the message")]
    NoHandler,

    #[error("Handler failed: {handler} — {reason}")]
    ProcessingFailed { handler: String, reason: String },

    #[error("Unresolvable reference: {0}")]
    UnresolvableReference(String),

    #[error("Missing entity field '{field}' for {entity}")]
    MissingEntityField { entity: String, field: String },

    #[error("External service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Append failed: {0}")]
    AppendFailed(String),
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Context store poisoned: {0}")]
    Poisoned(String),
}
