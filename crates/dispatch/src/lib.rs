//! # Blotter Dispatch
//!
//! The dispatch and context-resolution layer: per-conversation context
//! store, pronoun resolver, small-talk responder, and the
//! priority-ordered route table.

pub mod context;
pub mod dispatcher;
pub mod resolver;
pub mod smalltalk;

pub use context::{ContextStore, ConversationContext};
pub use dispatcher::{DispatchOutcome, Dispatcher, SMALLTALK};
pub use resolver::{PronounResolver, Resolution};
pub use smalltalk::SmallTalk;
