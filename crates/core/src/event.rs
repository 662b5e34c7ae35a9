//! Domain event system — decoupled communication between bounded contexts.
//!
//! Events are published when something interesting happens in the
//! pipeline. The streaming transport subscribes and forwards them as
//! progress frames; nothing else depends on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user message entered the dispatcher
    MessageReceived {
        conversation_id: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The dispatcher committed to a handler
    HandlerAssigned {
        conversation_id: String,
        handler: String,
        timestamp: DateTime<Utc>,
    },

    /// A handler finished processing a message
    HandlerCompleted {
        conversation_id: String,
        handler: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A hybrid search finished (possibly with partial collection failures)
    SearchCompleted {
        query_preview: String,
        collections_searched: usize,
        collections_failed: usize,
        results: usize,
        timestamp: DateTime<Utc>,
    },

    /// A trade row was appended to the ledger
    TradeLogged {
        ticket_id: String,
        client: String,
        ticker: String,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
