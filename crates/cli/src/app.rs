//! Shared application wiring: builds the provider, ledger, collections,
//! retrieval engine, route table, and dispatcher from one `AppConfig`.

use anyhow::Context;
use blotter_config::AppConfig;
use blotter_core::event::EventBus;
use blotter_core::{CompletionProvider, VectorCollection};
use blotter_core::ledger::LedgerStore;
use blotter_dispatch::{ContextStore, Dispatcher};
use blotter_handlers::{
    HandlerDeps, NullCalendarClient, NullEmailSender, NullQuoteClient, standard_routes,
};
use blotter_ledger::CsvLedger;
use blotter_retrieval::{Chunker, Indexer, RetrievalEngine, TRADES, standard_collections};
use std::sync::Arc;
use tracing::{info, warn};

pub struct App {
    pub config: AppConfig,
    pub events: Arc<EventBus>,
    pub dispatcher: Arc<Dispatcher>,
    pub ledger: Arc<CsvLedger>,
    pub indexer: Arc<Indexer>,
    pub engine: Arc<RetrievalEngine>,
}

impl App {
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let provider: Arc<dyn CompletionProvider> =
            blotter_providers::from_config(&config).context("building provider")?;
        // The null provider reports dimension 0; size collections from
        // config so indexing errors stay per-record.
        let dimension = if provider.dimension() == 0 {
            config.provider.dimension
        } else {
            provider.dimension()
        };

        let ledger = Arc::new(CsvLedger::new(&config.ledger.csv_path));
        let collections = standard_collections(dimension);
        let indexer = Arc::new(Indexer::new(
            provider.clone(),
            Chunker::new(config.retrieval.chunk_size, config.retrieval.overlap_fraction),
        ));
        let events = Arc::new(EventBus::default());

        // Existing ledger rows become searchable at startup.
        let rows = ledger.all().await.context("reading ledger")?;
        if !rows.is_empty() {
            let trades = collections
                .iter()
                .find(|c| c.name() == TRADES)
                .cloned()
                .context("trades collection missing")?;
            match indexer.index_trades(trades.as_ref(), &rows).await {
                Ok(count) => info!(count, "Indexed existing ledger rows"),
                Err(e) => warn!(error = %e, "Ledger rows could not be indexed"),
            }
        }

        let engine = Arc::new(
            RetrievalEngine::new(provider.clone(), collections, &config.retrieval)
                .with_events(events.clone()),
        );

        let (routes, fallback) = standard_routes(HandlerDeps {
            provider,
            ledger: ledger.clone(),
            engine: engine.clone(),
            indexer: indexer.clone(),
            email: Arc::new(NullEmailSender),
            calendar: Arc::new(NullCalendarClient::new()),
            quotes: Arc::new(NullQuoteClient),
            idk_message: config.retrieval.idk_message.clone(),
            events: Some(events.clone()),
        });

        let store = Arc::new(ContextStore::new(&config.context));
        let dispatcher =
            Arc::new(Dispatcher::new(store, routes, fallback).with_events(events.clone()));

        Ok(Self {
            config,
            events,
            dispatcher,
            ledger,
            indexer,
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blotter_core::ledger::{Side, TradeRow};
    use blotter_core::message::IncomingMessage;

    fn offline_config(dir: &tempfile::TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.kind = "hashing".into();
        config.provider.dimension = 256;
        config.ledger.csv_path = dir.path().join("blotter.csv").display().to_string();
        config
    }

    #[tokio::test]
    async fn builds_an_offline_stack() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::build(offline_config(&dir)).await.unwrap();

        let outcome = app
            .dispatcher
            .dispatch(IncomingMessage::new("hello").with_conversation("c"))
            .await;
        assert!(outcome.reply.success);
    }

    #[tokio::test]
    async fn startup_indexes_existing_ledger_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(&dir);

        let ledger = CsvLedger::new(&config.ledger.csv_path);
        ledger
            .append(&TradeRow::new("Alice Johnson", Side::Buy, "TSLA", 100))
            .await
            .unwrap();

        let app = App::build(config).await.unwrap();
        let trades = app
            .engine
            .collections()
            .iter()
            .find(|c| c.name() == TRADES)
            .unwrap()
            .clone();
        assert_eq!(trades.count().await.unwrap(), 1);
    }
}
