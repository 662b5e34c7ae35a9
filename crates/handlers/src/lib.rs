//! # Blotter Handlers
//!
//! The capability handlers behind the dispatcher's route table: trade
//! logging, client lookup, outbound messaging, calendar scheduling,
//! market quotes, and knowledge-base search. `standard_routes` wires
//! them in priority order.

pub mod data_lookup;
pub mod knowledge;
pub mod market_data;
pub mod messaging;
pub mod scheduling;
pub mod trade_log;

pub use data_lookup::DataLookupHandler;
pub use knowledge::KnowledgeHandler;
pub use market_data::{MarketDataHandler, NullQuoteClient, Quote, QuoteClient};
pub use messaging::{EmailSender, MessagingHandler, NullEmailSender};
pub use scheduling::{
    CalendarCancelHandler, CalendarClient, CalendarCreateHandler, Meeting, NullCalendarClient,
};
pub use trade_log::TradeLogHandler;

use blotter_core::event::EventBus;
use blotter_core::handler::Handler;
use blotter_core::ledger::LedgerStore;
use blotter_core::{CompletionProvider, VectorCollection};
use blotter_retrieval::{Indexer, RetrievalEngine, COMMUNICATIONS, TRADES};
use std::sync::Arc;

/// Everything the standard route table needs.
pub struct HandlerDeps {
    pub provider: Arc<dyn CompletionProvider>,
    pub ledger: Arc<dyn LedgerStore>,
    pub engine: Arc<RetrievalEngine>,
    pub indexer: Arc<Indexer>,
    pub email: Arc<dyn EmailSender>,
    pub calendar: Arc<dyn CalendarClient>,
    pub quotes: Arc<dyn QuoteClient>,
    pub idk_message: String,
    pub events: Option<Arc<EventBus>>,
}

fn collection(engine: &RetrievalEngine, name: &str) -> Option<Arc<dyn VectorCollection>> {
    engine
        .collections()
        .iter()
        .find(|c| c.name() == name)
        .cloned()
}

/// Build the route table in dispatch priority order, plus the default
/// handler. Cancellation outranks creation, specific intents outrank
/// knowledge search, and data lookup takes whatever is left.
pub fn standard_routes(deps: HandlerDeps) -> (Vec<Arc<dyn Handler>>, Arc<dyn Handler>) {
    let trades = collection(&deps.engine, TRADES)
        .unwrap_or_else(|| Arc::new(blotter_retrieval::InMemoryCollection::new(TRADES, 0)));
    let communications = collection(&deps.engine, COMMUNICATIONS).unwrap_or_else(|| {
        Arc::new(blotter_retrieval::InMemoryCollection::new(COMMUNICATIONS, 0))
    });

    let mut trade_log = TradeLogHandler::new(
        deps.ledger.clone(),
        deps.provider.clone(),
        deps.indexer.clone(),
        trades,
    );
    if let Some(events) = &deps.events {
        trade_log = trade_log.with_events(events.clone());
    }

    let routes: Vec<Arc<dyn Handler>> = vec![
        Arc::new(CalendarCancelHandler::new(deps.calendar.clone())),
        Arc::new(CalendarCreateHandler::new(deps.calendar)),
        Arc::new(trade_log),
        Arc::new(MessagingHandler::new(
            deps.provider,
            deps.email,
            deps.indexer,
            communications,
        )),
        Arc::new(MarketDataHandler::new(deps.quotes)),
        Arc::new(KnowledgeHandler::new(deps.engine, deps.idk_message)),
    ];
    let fallback: Arc<dyn Handler> = Arc::new(DataLookupHandler::new(deps.ledger));
    (routes, fallback)
}
