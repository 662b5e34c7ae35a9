//! # Blotter Retrieval
//!
//! The hybrid retrieval engine: sentence-aware chunking, confidence
//! tiers, query rewriting, in-memory cosine collections, and the
//! multi-collection search orchestrator with citation assembly.

pub mod chunker;
pub mod collection;
pub mod confidence;
pub mod engine;
pub mod indexer;
pub mod rewrite;

pub use chunker::{Chunk, Chunker};
pub use collection::{cosine_similarity, InMemoryCollection};
pub use confidence::{classify, ConfidenceLabel, ConfidenceThreshold};
pub use engine::{Citation, RetrievalEngine, RetrievalOutcome, SearchResult, SearchScope};
pub use indexer::{Indexer, COMMUNICATIONS, POLICY, TRADES};
pub use rewrite::QueryRewriter;

use blotter_core::collection::VectorCollection;
use std::sync::Arc;

/// The three standard collections in canonical scan order.
pub fn standard_collections(dimension: usize) -> Vec<Arc<dyn VectorCollection>> {
    vec![
        Arc::new(InMemoryCollection::new(TRADES, dimension)),
        Arc::new(InMemoryCollection::new(COMMUNICATIONS, dimension)),
        Arc::new(InMemoryCollection::new(POLICY, dimension)),
    ]
}
