//! Market data lookups: resolve a ticker from the query and fetch a
//! quote from the configured backend.

use async_trait::async_trait;
use blotter_core::error::HandlerError;
use blotter_core::handler::{Handler, HandlerReply, TurnContext};
use regex_lite::Regex;
use std::sync::Arc;

const QUOTE_WORDS: [&str; 5] = ["price", "quote", "trading at", "stock", "market"];

/// Company-name aliases for tickers the desk quotes most.
const ALIASES: [(&str, &str); 6] = [
    ("tesla", "TSLA"),
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("google", "GOOGL"),
    ("amazon", "AMZN"),
    ("nvidia", "NVDA"),
];

#[derive(Debug, Clone)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub change_percent: f64,
}

/// Quote backend.
#[async_trait]
pub trait QuoteClient: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<Quote, HandlerError>;
}

/// Used when no market-data feed is configured.
pub struct NullQuoteClient;

#[async_trait]
impl QuoteClient for NullQuoteClient {
    async fn quote(&self, _ticker: &str) -> Result<Quote, HandlerError> {
        Err(HandlerError::ServiceUnavailable(
            "no market data feed configured".into(),
        ))
    }
}

pub struct MarketDataHandler {
    quotes: Arc<dyn QuoteClient>,
    ticker_re: Regex,
}

impl MarketDataHandler {
    pub fn new(quotes: Arc<dyn QuoteClient>) -> Self {
        Self {
            quotes,
            ticker_re: Regex::new(r"\b([A-Z]{2,5})\b").unwrap(),
        }
    }

    /// Explicit ticker first, then company aliases, then the carried
    /// entity's last traded symbol.
    fn resolve_ticker(&self, query: &str, ctx: &TurnContext) -> Option<String> {
        if let Some(m) = self.ticker_re.captures(query).and_then(|c| c.get(1)) {
            return Some(m.as_str().to_string());
        }
        let lower = query.to_lowercase();
        for (alias, ticker) in ALIASES {
            if lower.contains(alias) {
                return Some(ticker.to_string());
            }
        }
        ctx.last_entity
            .as_ref()
            .map(|e| e.field_str("last_ticker").to_string())
            .filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl Handler for MarketDataHandler {
    fn name(&self) -> &str {
        "market_data"
    }

    fn can_handle(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        QUOTE_WORDS.iter().any(|w| lower.contains(w))
    }

    async fn process(&self, query: &str, ctx: &TurnContext) -> Result<HandlerReply, HandlerError> {
        let Some(ticker) = self.resolve_ticker(query, ctx) else {
            return Ok(HandlerReply::failure(
                "Which symbol? Give me a ticker or a company name.",
            ));
        };
        let quote = self.quotes.quote(&ticker).await?;
        Ok(HandlerReply::text(format!(
            "{} is at {:.2} ({:+.2}% today).",
            quote.ticker, quote.price, quote.change_percent
        ))
        .with_data(serde_json::json!({
            "ticker": quote.ticker,
            "price": quote.price,
            "change_percent": quote.change_percent,
        })))
    }
}
