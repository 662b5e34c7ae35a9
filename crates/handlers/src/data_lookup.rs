//! Data lookup — the default handler.
//!
//! Answers "show me X", "what's X's email", and anything no other
//! route claims, by aggregating the client's ledger rows into a
//! profile. The resolved client is written into conversation context
//! so following turns can say "her" and "his".

use async_trait::async_trait;
use blotter_core::error::HandlerError;
use blotter_core::handler::{Handler, HandlerReply, ResolvedEntity, TurnContext};
use blotter_core::ledger::{LedgerStore, Side, TradeRow};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct DataLookupHandler {
    ledger: Arc<dyn LedgerStore>,
}

/// Aggregated view of one client's ledger activity.
#[derive(Debug, Default)]
struct ClientProfile {
    name: String,
    accounts: Vec<String>,
    emails: Vec<String>,
    tickers: BTreeMap<String, usize>,
    buys: usize,
    sells: usize,
    solicited: usize,
    total: usize,
}

impl ClientProfile {
    fn build(name: &str, rows: &[TradeRow]) -> Self {
        let mut profile = Self {
            name: name.to_string(),
            ..Self::default()
        };
        for row in rows {
            profile.total += 1;
            match row.side {
                Side::Buy => profile.buys += 1,
                Side::Sell => profile.sells += 1,
            }
            if row.solicited {
                profile.solicited += 1;
            }
            *profile.tickers.entry(row.ticker.clone()).or_insert(0) += 1;
            if !row.account.is_empty() && !profile.accounts.contains(&row.account) {
                profile.accounts.push(row.account.clone());
            }
            if !row.email.is_empty() && !profile.emails.contains(&row.email) {
                profile.emails.push(row.email.clone());
            }
        }
        profile
    }

    fn summary(&self) -> String {
        let tickers = self
            .tickers
            .iter()
            .map(|(ticker, count)| format!("{ticker} x{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut lines = vec![format!(
            "{}: {} trades ({} buys, {} sells, {} solicited). Tickers: {}.",
            self.name, self.total, self.buys, self.sells, self.solicited, tickers
        )];
        if !self.emails.is_empty() {
            lines.push(format!("Email: {}.", self.emails.join(", ")));
        }
        if !self.accounts.is_empty() {
            lines.push(format!("Accounts: {}.", self.accounts.join(", ")));
        }
        lines.join(" ")
    }

    fn entity(&self) -> ResolvedEntity {
        let mut entity = ResolvedEntity::new(&self.name);
        if let Some(email) = self.emails.first() {
            entity.fields.insert("email".into(), email.clone().into());
        }
        if let Some(account) = self.accounts.first() {
            entity
                .fields
                .insert("account".into(), account.clone().into());
        }
        if let Some((ticker, _)) = self.tickers.iter().next() {
            entity
                .fields
                .insert("last_ticker".into(), ticker.clone().into());
        }
        entity
    }
}

impl DataLookupHandler {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Match a client by scanning the ledger's distinct names against
    /// the query (case-insensitive; first name alone is enough).
    async fn find_client(&self, query: &str) -> Result<Option<String>, HandlerError> {
        let lower = query.to_lowercase();
        let rows = self
            .ledger
            .all()
            .await
            .map_err(|e| HandlerError::ProcessingFailed {
                handler: "data_lookup".into(),
                reason: e.to_string(),
            })?;

        for row in &rows {
            let name = row.client.to_lowercase();
            if lower.contains(&name) {
                return Ok(Some(row.client.clone()));
            }
            if let Some(first) = name.split_whitespace().next() {
                if lower
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| word == first)
                {
                    return Ok(Some(row.client.clone()));
                }
            }
        }
        Ok(None)
    }

    fn looks_like_pronoun_reference(query: &str) -> bool {
        let lower = query.to_lowercase();
        ["his", "her", "their", "he", "she", "they", "him"]
            .iter()
            .any(|p| lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == *p))
    }
}

#[async_trait]
impl Handler for DataLookupHandler {
    fn name(&self) -> &str {
        "data_lookup"
    }

    /// Default route: claims everything that reaches it.
    fn can_handle(&self, _query: &str) -> bool {
        true
    }

    async fn process(&self, query: &str, ctx: &TurnContext) -> Result<HandlerReply, HandlerError> {
        let client = match self.find_client(query).await? {
            Some(client) => Some(client),
            None => ctx.last_entity.as_ref().map(|e| e.name.clone()),
        };

        let Some(client) = client else {
            // An unresolved pronoun means context was empty; ask the
            // user to disambiguate instead of guessing.
            if Self::looks_like_pronoun_reference(query) {
                return Ok(HandlerReply::failure(
                    "I'm not sure who you're referring to — could you name the client?",
                ));
            }
            let rows = self
                .ledger
                .all()
                .await
                .map_err(|e| HandlerError::ProcessingFailed {
                    handler: "data_lookup".into(),
                    reason: e.to_string(),
                })?;
            return Ok(HandlerReply::text(format!(
                "The ledger holds {} trades. Name a client for details.",
                rows.len()
            )));
        };

        let rows = self
            .ledger
            .for_client(&client)
            .await
            .map_err(|e| HandlerError::ProcessingFailed {
                handler: "data_lookup".into(),
                reason: e.to_string(),
            })?;

        if rows.is_empty() {
            return Ok(HandlerReply::failure(format!(
                "No ledger entries found for {client}."
            )));
        }

        let profile = ClientProfile::build(&client, &rows);

        // "what's X's email" style questions answer with the address
        // alone; everything else gets the profile summary.
        let text = if query.to_lowercase().contains("email") {
            match profile.emails.first() {
                Some(email) => format!("{}'s email is {email}.", profile.name),
                None => format!("No email on file for {}.", profile.name),
            }
        } else {
            profile.summary()
        };

        Ok(HandlerReply::text(text).with_entity(profile.entity()))
    }
}
