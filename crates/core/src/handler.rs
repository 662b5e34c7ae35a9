//! Handler trait — the abstraction over capability handlers.
//!
//! Each capability (trade logging, data lookup, messaging, scheduling,
//! market data, knowledge base) implements this trait. The dispatcher
//! probes `can_handle` in a fixed priority order and commits to the
//! first handler that claims the message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HandlerError;

/// A named entity resolved by a handler (e.g., a client record).
///
/// Written into conversation context after the handler completes, so
/// the next turn can resolve pronouns against it. Last write wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedEntity {
    /// Display name (e.g., "Sheila Carter")
    pub name: String,

    /// Structured fields (email, account, last ticker, ...)
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ResolvedEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Fetch a field as a string, empty if absent.
    pub fn field_str(&self, key: &str) -> &str {
        self.fields.get(key).and_then(|v| v.as_str()).unwrap_or("")
    }
}

/// Read-only snapshot of conversation state handed to a handler.
///
/// Handlers never touch the context store directly; the dispatcher
/// builds this before the call and applies the reply's entity after
/// the handler completes successfully.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    /// The conversation this turn belongs to
    pub conversation_id: String,

    /// Entity carried over from earlier turns, if any
    pub last_entity: Option<ResolvedEntity>,

    /// Recent user turns, oldest first (bounded by the context store)
    pub history: Vec<String>,
}

/// The outcome of a handler processing one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerReply {
    /// User-facing response text
    pub text: String,

    /// Whether the handler considers the request fulfilled
    pub success: bool,

    /// Entity to carry into the next turn (overwrites, never merges)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<ResolvedEntity>,

    /// Optional structured payload for the transport (tables, quotes, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl HandlerReply {
    /// A successful text-only reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
            entity: None,
            data: None,
        }
    }

    /// A failed reply with a user-facing explanation.
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
            entity: None,
            data: None,
        }
    }

    pub fn with_entity(mut self, entity: ResolvedEntity) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The core capability handler trait.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The unique handler name (e.g., "data_lookup", "messaging").
    fn name(&self) -> &str;

    /// Keyword/pattern predicate: can this handler process the query?
    ///
    /// Must be cheap, deterministic, and side-effect free — the
    /// dispatcher calls candidates in priority order and the ordering
    /// is load-bearing policy.
    fn can_handle(&self, query: &str) -> bool;

    /// Process the (already pronoun-resolved) query.
    async fn process(
        &self,
        query: &str,
        ctx: &TurnContext,
    ) -> std::result::Result<HandlerReply, HandlerError>;
}
