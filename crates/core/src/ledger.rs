//! Trade-ledger domain types and the storage trait.
//!
//! A `TradeRow` is one logged trade as it lives in the blotter: who
//! traded, what, how much, at what stage the ticket is, plus the
//! follow-up bookkeeping an advisor keeps alongside it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse from free text. Recognizes "buy"/"bought"/"purchase" and
    /// "sell"/"sold".
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("sell") || lower.contains("sold") {
            Some(Side::Sell)
        } else if lower.contains("buy") || lower.contains("bought") || lower.contains("purchase") {
            Some(Side::Buy)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// One row of the trade ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRow {
    /// Unique ticket ID (generated at log time)
    pub ticket_id: String,

    /// Client display name
    pub client: String,

    /// Account identifier, empty if not captured
    #[serde(default)]
    pub account: String,

    pub side: Side,

    /// Ticker symbol, uppercased
    pub ticker: String,

    pub quantity: u64,

    /// "market" or "limit"
    #[serde(default)]
    pub order_type: String,

    /// Limit price if any (kept in every serialized row so CSV columns
    /// stay aligned)
    #[serde(default)]
    pub price: Option<f64>,

    /// Whether the trade was solicited by the advisor
    #[serde(default)]
    pub solicited: bool,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub notes: String,

    /// Follow-up action the advisor noted, empty if none
    #[serde(default)]
    pub follow_up: String,

    /// Client email on file, empty if unknown
    #[serde(default)]
    pub email: String,

    /// Ticket lifecycle stage ("logged", "confirmed", "settled")
    #[serde(default)]
    pub stage: String,

    #[serde(default)]
    pub meeting_needed: bool,
}

impl TradeRow {
    /// Start a row with the required fields; the rest default.
    pub fn new(client: impl Into<String>, side: Side, ticker: impl Into<String>, quantity: u64) -> Self {
        Self {
            ticket_id: Uuid::new_v4().to_string(),
            client: client.into(),
            account: String::new(),
            side,
            ticker: ticker.into().to_uppercase(),
            quantity,
            order_type: "market".to_string(),
            price: None,
            solicited: false,
            timestamp: Utc::now(),
            notes: String::new(),
            follow_up: String::new(),
            email: String::new(),
            stage: "logged".to_string(),
            meeting_needed: false,
        }
    }

    /// The canonical one-line sentence used when indexing this row for
    /// semantic search, e.g.
    /// "Client Alice Johnson traded 100 shares of TSLA (Buy) at market on 2026-08-12."
    pub fn index_sentence(&self) -> String {
        let price = match self.price {
            Some(p) => format!("limit {p:.2}"),
            None => self.order_type.clone(),
        };
        format!(
            "Client {} traded {} shares of {} ({}) at {} on {}.",
            self.client,
            self.quantity,
            self.ticker,
            self.side,
            price,
            self.timestamp.format("%Y-%m-%d"),
        )
    }
}

/// Storage backend for the trade ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append one row.
    async fn append(&self, row: &TradeRow) -> std::result::Result<(), LedgerError>;

    /// All rows, oldest first. Malformed rows are skipped with a warning,
    /// never abort the read.
    async fn all(&self) -> std::result::Result<Vec<TradeRow>, LedgerError>;

    /// Rows for one client, case-insensitive substring match on name.
    async fn for_client(&self, client: &str) -> std::result::Result<Vec<TradeRow>, LedgerError> {
        let needle = client.to_lowercase();
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|row| row.client.to_lowercase().contains(&needle))
            .collect())
    }
}
