//! # Blotter Core
//!
//! Domain types, traits, and error definitions for the Blotter trade-ledger
//! assistant. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod collection;
pub mod error;
pub mod event;
pub mod handler;
pub mod ledger;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use collection::{IndexedRecord, ScoredRecord, VectorCollection};
pub use error::{
    ContextError, Error, HandlerError, LedgerError, ProviderError, Result, RetrievalError,
};
pub use event::{DomainEvent, EventBus};
pub use handler::{Handler, HandlerReply, ResolvedEntity, TurnContext};
pub use ledger::{LedgerStore, Side, TradeRow};
pub use message::{ConversationId, IncomingMessage, Role, Turn};
pub use provider::CompletionProvider;
