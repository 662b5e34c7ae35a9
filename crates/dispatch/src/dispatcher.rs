//! The priority-ordered dispatcher.
//!
//! One pass per incoming message: resolve pronouns against the carried
//! entity, answer small-talk directly, otherwise walk the route table
//! in order and commit to the first handler whose predicate matches,
//! falling back to the default handler. Route order is policy: specific
//! intents are checked before generic ones, and reordering the table
//! changes behavior.

use blotter_core::event::{DomainEvent, EventBus};
use blotter_core::handler::{Handler, HandlerReply};
use blotter_core::message::{ConversationId, IncomingMessage, Turn};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::context::ContextStore;
use crate::resolver::PronounResolver;
use crate::smalltalk::SmallTalk;

/// Reserved route name for canned conversational replies.
pub const SMALLTALK: &str = "smalltalk";

/// What one dispatched turn produced.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub conversation_id: ConversationId,
    pub handler: String,
    pub reply: HandlerReply,
}

pub struct Dispatcher {
    store: Arc<ContextStore>,
    resolver: PronounResolver,
    smalltalk: SmallTalk,
    routes: Vec<Arc<dyn Handler>>,
    fallback: Arc<dyn Handler>,
    events: Option<Arc<EventBus>>,
}

impl Dispatcher {
    /// `routes` are probed in order; `fallback` takes everything else.
    pub fn new(
        store: Arc<ContextStore>,
        routes: Vec<Arc<dyn Handler>>,
        fallback: Arc<dyn Handler>,
    ) -> Self {
        Self {
            store,
            resolver: PronounResolver::new(),
            smalltalk: SmallTalk::new(),
            routes,
            fallback,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn context_store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Process one message end to end. Handler failures degrade to an
    /// unsuccessful reply rather than erroring the turn.
    pub async fn dispatch(&self, incoming: IncomingMessage) -> DispatchOutcome {
        let conversation_id = incoming
            .conversation_id
            .as_deref()
            .map(ConversationId::from)
            .unwrap_or_default();
        let message = incoming.message.trim().to_string();

        self.publish(DomainEvent::MessageReceived {
            conversation_id: conversation_id.to_string(),
            content_preview: message.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        // Snapshot before recording this turn so the rewriter's history
        // window covers prior turns only.
        let ctx = self.store.snapshot(&conversation_id).await;
        self.store
            .record_turn(&conversation_id, Turn::user(&message))
            .await;

        if let Some(reply) = self.smalltalk.respond(&message) {
            self.store
                .record_turn(&conversation_id, Turn::assistant(&reply))
                .await;
            return DispatchOutcome {
                conversation_id,
                handler: SMALLTALK.into(),
                reply: HandlerReply::text(reply),
            };
        }

        let resolution = self
            .resolver
            .resolve(&message, ctx.last_entity.as_ref().map(|e| e.name.as_str()));
        let query = resolution.text;

        let handler = self
            .routes
            .iter()
            .find(|h| h.can_handle(&query))
            .unwrap_or(&self.fallback);

        info!(
            conversation = %conversation_id,
            handler = handler.name(),
            resolved = resolution.substituted,
            "Dispatching message"
        );
        self.publish(DomainEvent::HandlerAssigned {
            conversation_id: conversation_id.to_string(),
            handler: handler.name().to_string(),
            timestamp: Utc::now(),
        });

        let started = Instant::now();
        let reply = match handler.process(&query, &ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(handler = handler.name(), error = %e, "Handler failed");
                self.publish(DomainEvent::ErrorOccurred {
                    context: handler.name().to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                HandlerReply::failure(format!("Sorry, I couldn't complete that: {e}"))
            }
        };

        self.publish(DomainEvent::HandlerCompleted {
            conversation_id: conversation_id.to_string(),
            handler: handler.name().to_string(),
            success: reply.success,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });

        // Context writes happen only after the handler completed.
        if let Some(entity) = &reply.entity {
            self.store.set_entity(&conversation_id, entity.clone()).await;
        }
        self.store
            .record_turn(&conversation_id, Turn::assistant(&reply.text))
            .await;

        DispatchOutcome {
            conversation_id,
            handler: handler.name().to_string(),
            reply,
        }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
