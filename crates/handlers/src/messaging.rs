//! Outbound messaging: compose and send client emails.
//!
//! The recipient address comes from an explicit address in the query
//! or from the carried entity; the body is drafted by the completion
//! collaborator with a plain template fallback. Sent mail is appended
//! to the communications collection so later searches can find it.

use async_trait::async_trait;
use blotter_core::error::HandlerError;
use blotter_core::handler::{Handler, HandlerReply, TurnContext};
use blotter_core::{CompletionProvider, VectorCollection};
use blotter_retrieval::Indexer;
use regex_lite::Regex;
use std::sync::Arc;
use tracing::{info, warn};

const SEND_WORDS: [&str; 4] = ["send", "email", "message", "write"];
// Queries about an address are lookups, not sends.
const LOOKUP_WORDS: [&str; 5] = ["what", "address", "find", "show", "lookup"];

/// Outbound mail transport.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), HandlerError>;
}

/// Logs instead of sending. Used when no transport is configured.
pub struct NullEmailSender;

#[async_trait]
impl EmailSender for NullEmailSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), HandlerError> {
        info!(to, subject, "No email transport configured, message not delivered");
        Ok(())
    }
}

pub struct MessagingHandler {
    provider: Arc<dyn CompletionProvider>,
    sender: Arc<dyn EmailSender>,
    indexer: Arc<Indexer>,
    communications: Arc<dyn VectorCollection>,
    address_re: Regex,
}

impl MessagingHandler {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        sender: Arc<dyn EmailSender>,
        indexer: Arc<Indexer>,
        communications: Arc<dyn VectorCollection>,
    ) -> Self {
        Self {
            provider,
            sender,
            indexer,
            communications,
            address_re: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
        }
    }

    fn recipient(&self, query: &str, ctx: &TurnContext) -> Option<(String, String)> {
        if let Some(m) = self.address_re.find(query) {
            let address = m.as_str().to_string();
            let name = ctx
                .last_entity
                .as_ref()
                .map(|e| e.name.clone())
                .unwrap_or_else(|| address.clone());
            return Some((name, address));
        }
        let entity = ctx.last_entity.as_ref()?;
        let address = entity.field_str("email");
        if address.is_empty() {
            return None;
        }
        Some((entity.name.clone(), address.to_string()))
    }

    async fn compose(&self, query: &str, recipient: &str) -> (String, String) {
        let prompt = format!(
            "Draft a short, professional email for this request. Reply as JSON \
             with keys subject and body only.\n\nRecipient: {recipient}\nRequest: {query}"
        );
        if let Ok(response) = self.provider.complete(&prompt).await {
            let json = response
                .trim()
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim();
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(json) {
                if let (Some(subject), Some(body)) = (
                    value.get("subject").and_then(|v| v.as_str()),
                    value.get("body").and_then(|v| v.as_str()),
                ) {
                    return (subject.to_string(), body.to_string());
                }
            }
        }
        (
            "Update from your advisor".to_string(),
            format!("Hi {recipient},\n\n{query}\n\nBest regards"),
        )
    }
}

#[async_trait]
impl Handler for MessagingHandler {
    fn name(&self) -> &str {
        "messaging"
    }

    fn can_handle(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        let wants_send = SEND_WORDS.iter().any(|w| lower.contains(w));
        let is_lookup = LOOKUP_WORDS.iter().any(|w| lower.contains(w));
        wants_send && !is_lookup && (lower.contains("email") || lower.contains("message"))
    }

    async fn process(&self, query: &str, ctx: &TurnContext) -> Result<HandlerReply, HandlerError> {
        let Some((name, address)) = self.recipient(query, ctx) else {
            return Ok(HandlerReply::failure(
                "I don't have an email address for that. Include one, or look the client up first.",
            ));
        };

        let (subject, body) = self.compose(query, &name).await;
        self.sender.send(&address, &subject, &body).await?;

        // Best effort: the message already went out.
        if let Err(e) = self
            .indexer
            .index_communication(self.communications.as_ref(), &address, &subject, &body)
            .await
        {
            warn!(error = %e, "Sent email could not be indexed");
        }

        Ok(HandlerReply::text(format!(
            "Email sent to {name} <{address}>: \"{subject}\"."
        ))
        .with_data(serde_json::json!({ "to": address, "subject": subject })))
    }
}
