//! Message and conversation-turn domain types.
//!
//! These are the value objects that flow through the whole pipeline:
//! a user message arrives → the resolver rewrites it → a handler
//! processes it → the reply and both turns land in conversation context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
}

/// A single recorded turn in a conversation.
///
/// Turns are what the context store keeps (bounded, oldest evicted
/// first) and what the query rewriter sees as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the turn happened
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Record a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Record an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An incoming chat message as delivered by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// The raw user text
    pub message: String,

    /// Conversation this message belongs to (new one created if absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Transport-supplied context (unused by the core, passed through)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: serde_json::Map<String, serde_json::Value>,
}

impl IncomingMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            context: serde_json::Map::new(),
        }
    }

    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_turn_has_role_and_timestamp() {
        let turn = Turn::user("show me Alice's trades");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "show me Alice's trades");
    }

    #[test]
    fn conversation_id_display() {
        let id = ConversationId::from("conv-42");
        assert_eq!(id.to_string(), "conv-42");
    }

    #[test]
    fn incoming_message_serialization_roundtrip() {
        let msg = IncomingMessage::new("hello").with_conversation("c1");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: IncomingMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.message, "hello");
        assert_eq!(parsed.conversation_id.as_deref(), Some("c1"));
    }
}
