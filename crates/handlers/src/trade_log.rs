//! Trade-log handler: free text in, ledger row out.
//!
//! Extraction is two-tier: the completion collaborator is asked for a
//! structured JSON ticket first, with a regex fallback for ticker,
//! quantity, side, and client when it is unavailable. Every appended
//! row is also indexed into the trades collection so retrieval sees it
//! on the next query.

use async_trait::async_trait;
use blotter_core::error::HandlerError;
use blotter_core::event::{DomainEvent, EventBus};
use blotter_core::handler::{Handler, HandlerReply, ResolvedEntity, TurnContext};
use blotter_core::ledger::{LedgerStore, Side, TradeRow};
use blotter_core::{CompletionProvider, VectorCollection};
use blotter_retrieval::Indexer;
use chrono::Utc;
use regex_lite::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

const TRADE_WORDS: [&str; 7] = ["trade", "bought", "sold", "buy", "sell", "shares", "order"];

pub struct TradeLogHandler {
    ledger: Arc<dyn LedgerStore>,
    provider: Arc<dyn CompletionProvider>,
    indexer: Arc<Indexer>,
    trades: Arc<dyn VectorCollection>,
    events: Option<Arc<EventBus>>,
    quantity_re: Regex,
    ticker_re: Regex,
    client_re: Regex,
}

impl TradeLogHandler {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        provider: Arc<dyn CompletionProvider>,
        indexer: Arc<Indexer>,
        trades: Arc<dyn VectorCollection>,
    ) -> Self {
        Self {
            ledger,
            provider,
            indexer,
            trades,
            events: None,
            quantity_re: Regex::new(r"\b(\d{1,7})\b").unwrap(),
            ticker_re: Regex::new(r"\b([A-Z]{2,5})\b").unwrap(),
            client_re: Regex::new(r"(?:for|client)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)").unwrap(),
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Ask the collaborator for a structured ticket. Any failure falls
    /// back to regex extraction.
    async fn extract_via_provider(&self, query: &str) -> Option<TradeRow> {
        let prompt = format!(
            "Extract the trade from this message as JSON with keys \
             client, side (buy/sell), ticker, quantity, order_type (market/limit), \
             price (number or null), solicited (bool), notes. \
             Reply with JSON only.\n\nMessage: {query}"
        );
        let response = self.provider.complete(&prompt).await.ok()?;
        let json = response
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let value: serde_json::Value = serde_json::from_str(json).ok()?;

        let client = value.get("client")?.as_str()?.to_string();
        let side = Side::parse(value.get("side")?.as_str()?)?;
        let ticker = value.get("ticker")?.as_str()?.to_string();
        let quantity = value.get("quantity")?.as_u64()?;

        let mut row = TradeRow::new(client, side, ticker, quantity);
        if let Some(order_type) = value.get("order_type").and_then(|v| v.as_str()) {
            row.order_type = order_type.to_string();
        }
        row.price = value.get("price").and_then(|v| v.as_f64());
        row.solicited = value
            .get("solicited")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if let Some(notes) = value.get("notes").and_then(|v| v.as_str()) {
            row.notes = notes.to_string();
        }
        Some(row)
    }

    /// Deterministic fallback: first integer is the quantity, first
    /// all-caps token is the ticker, client comes from "for <Name>" or
    /// the carried entity.
    fn extract_via_regex(&self, query: &str, ctx: &TurnContext) -> Result<TradeRow, HandlerError> {
        let side = Side::parse(query).ok_or_else(|| HandlerError::ProcessingFailed {
            handler: "trade_log".into(),
            reason: "couldn't tell whether this is a buy or a sell".into(),
        })?;

        let quantity = self
            .quantity_re
            .captures(query)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .ok_or_else(|| HandlerError::ProcessingFailed {
                handler: "trade_log".into(),
                reason: "no share quantity found".into(),
            })?;

        let ticker = self
            .ticker_re
            .captures(query)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| HandlerError::ProcessingFailed {
                handler: "trade_log".into(),
                reason: "no ticker symbol found".into(),
            })?;

        let client = self
            .client_re
            .captures(query)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| ctx.last_entity.as_ref().map(|e| e.name.clone()))
            .ok_or(HandlerError::MissingEntityField {
                entity: "trade".into(),
                field: "client".into(),
            })?;

        Ok(TradeRow::new(client, side, ticker, quantity))
    }
}

#[async_trait]
impl Handler for TradeLogHandler {
    fn name(&self) -> &str {
        "trade_log"
    }

    /// Explicit "log ..." requests, or long messages that read like a
    /// trade recap.
    fn can_handle(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        let has_trade_word = TRADE_WORDS.iter().any(|w| lower.contains(w));

        if lower.contains("log") && has_trade_word {
            return true;
        }
        lower.split_whitespace().count() > 15
            && Side::parse(&lower).is_some()
            && lower.contains("shares")
    }

    async fn process(&self, query: &str, ctx: &TurnContext) -> Result<HandlerReply, HandlerError> {
        let row = match self.extract_via_provider(query).await {
            Some(row) => row,
            None => {
                debug!("Structured extraction unavailable, using regex fallback");
                self.extract_via_regex(query, ctx)?
            }
        };

        self.ledger
            .append(&row)
            .await
            .map_err(|e| HandlerError::ProcessingFailed {
                handler: "trade_log".into(),
                reason: e.to_string(),
            })?;

        // Indexing is best effort: the row is already on the ledger.
        if let Err(e) = self.indexer.index_trades(self.trades.as_ref(), std::slice::from_ref(&row)).await {
            warn!(error = %e, "Logged trade could not be indexed");
        }

        if let Some(events) = &self.events {
            events.publish(DomainEvent::TradeLogged {
                ticket_id: row.ticket_id.clone(),
                client: row.client.clone(),
                ticker: row.ticker.clone(),
                timestamp: Utc::now(),
            });
        }

        let mut entity = ResolvedEntity::new(&row.client);
        entity
            .fields
            .insert("last_ticker".into(), row.ticker.clone().into());
        if !row.email.is_empty() {
            entity.fields.insert("email".into(), row.email.clone().into());
        }

        Ok(HandlerReply::text(format!(
            "Logged ticket {}: {} {} {} shares of {} ({}).",
            row.ticket_id, row.client, row.side, row.quantity, row.ticker, row.order_type
        ))
        .with_entity(entity)
        .with_data(serde_json::json!({ "ticket_id": row.ticket_id })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blotter_core::error::{LedgerError, ProviderError};
    use blotter_retrieval::{Chunker, InMemoryCollection};
    use tokio::sync::Mutex;

    struct MemoryLedger {
        rows: Mutex<Vec<TradeRow>>,
    }

    #[async_trait]
    impl LedgerStore for MemoryLedger {
        async fn append(&self, row: &TradeRow) -> Result<(), LedgerError> {
            self.rows.lock().await.push(row.clone());
            Ok(())
        }
        async fn all(&self) -> Result<Vec<TradeRow>, LedgerError> {
            Ok(self.rows.lock().await.clone())
        }
    }

    struct NoProvider;

    #[async_trait]
    impl CompletionProvider for NoProvider {
        fn name(&self) -> &str {
            "none"
        }
        async fn complete(&self, _p: &str) -> Result<String, ProviderError> {
            Err(ProviderError::NotConfigured("offline".into()))
        }
        async fn embed(&self, _t: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![1.0, 0.0])
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    struct JsonProvider;

    #[async_trait]
    impl CompletionProvider for JsonProvider {
        fn name(&self) -> &str {
            "json"
        }
        async fn complete(&self, _p: &str) -> Result<String, ProviderError> {
            Ok(r#"{"client":"Carol Diaz","side":"buy","ticker":"msft","quantity":75,
                   "order_type":"limit","price":410.25,"solicited":true,"notes":"rebalance"}"#
                .into())
        }
        async fn embed(&self, _t: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![1.0, 0.0])
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    fn handler(provider: Arc<dyn CompletionProvider>) -> (TradeLogHandler, Arc<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger {
            rows: Mutex::new(Vec::new()),
        });
        let indexer = Arc::new(Indexer::new(provider.clone(), Chunker::default()));
        let trades = Arc::new(InMemoryCollection::new("trades", 2));
        (
            TradeLogHandler::new(ledger.clone(), provider, indexer, trades),
            ledger,
        )
    }

    #[tokio::test]
    async fn predicate_matches_explicit_log_requests() {
        let (h, _) = handler(Arc::new(NoProvider));
        assert!(h.can_handle("log a trade: Alice bought 100 shares of TSLA"));
        assert!(h.can_handle(
            "please record this, the client Bob Lee called and sold two hundred, \
             actually 250 shares of AAPL at the open this morning"
        ));
        assert!(!h.can_handle("show me Alice's trades"));
        assert!(!h.can_handle("what's the TSLA price"));
    }

    #[tokio::test]
    async fn regex_fallback_extracts_a_ticket() {
        let (h, ledger) = handler(Arc::new(NoProvider));
        let reply = h
            .process(
                "log a trade for Alice Johnson bought 100 shares of TSLA",
                &TurnContext::default(),
            )
            .await
            .unwrap();

        assert!(reply.success);
        let rows = ledger.all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].client, "Alice Johnson");
        assert_eq!(rows[0].side, Side::Buy);
        assert_eq!(rows[0].ticker, "TSLA");
        assert_eq!(rows[0].quantity, 100);
        assert_eq!(reply.entity.unwrap().name, "Alice Johnson");
    }

    #[tokio::test]
    async fn carried_entity_supplies_the_client() {
        let (h, ledger) = handler(Arc::new(NoProvider));
        let ctx = TurnContext {
            conversation_id: "c".into(),
            last_entity: Some(ResolvedEntity::new("Bob Lee")),
            history: vec![],
        };
        h.process("log the trade, sold 50 shares of AAPL", &ctx)
            .await
            .unwrap();

        assert_eq!(ledger.all().await.unwrap()[0].client, "Bob Lee");
    }

    #[tokio::test]
    async fn provider_extraction_takes_precedence() {
        let (h, ledger) = handler(Arc::new(JsonProvider));
        h.process("log Carol's limit buy", &TurnContext::default())
            .await
            .unwrap();

        let rows = ledger.all().await.unwrap();
        assert_eq!(rows[0].client, "Carol Diaz");
        assert_eq!(rows[0].ticker, "MSFT");
        assert_eq!(rows[0].order_type, "limit");
        assert_eq!(rows[0].price, Some(410.25));
        assert!(rows[0].solicited);
    }

    #[tokio::test]
    async fn missing_quantity_is_reported() {
        let (h, _) = handler(Arc::new(NoProvider));
        let err = h
            .process("log that Alice bought some TSLA", &TurnContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::ProcessingFailed { .. }));
    }
}
