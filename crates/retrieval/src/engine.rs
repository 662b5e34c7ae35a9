//! The hybrid retrieval engine.
//!
//! Orchestrates one query end to end: rewrite, embed, per-collection
//! nearest-neighbor search, confidence filtering, cross-collection
//! ranking, truncation, and citation assembly. Collection failures are
//! tolerated per collection and reported through `stats`; the engine
//! itself never fails a conversation turn.

use blotter_core::collection::VectorCollection;
use blotter_core::event::{DomainEvent, EventBus};
use blotter_core::CompletionProvider;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::confidence::{classify, ConfidenceLabel, ConfidenceThreshold};
use crate::rewrite::QueryRewriter;

/// Which collections a search covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Every registered collection, in registration order.
    All,
    /// A single collection by name.
    Collection(String),
}

/// One ranked hit, constructed per query and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub source_collection: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub similarity: f32,
    pub confidence: ConfidenceLabel,
}

/// User-facing provenance record, derived 1:1 from a leading result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub source_label: String,
    pub url: String,
    pub confidence: ConfidenceLabel,
}

/// Everything a search returns to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub original_query: String,
    pub rewritten_query: String,
    pub results: Vec<SearchResult>,
    pub citations: Vec<Citation>,
    pub stats: serde_json::Map<String, serde_json::Value>,
}

impl RetrievalOutcome {
    fn empty(original: impl Into<String>, rewritten: impl Into<String>) -> Self {
        Self {
            original_query: original.into(),
            rewritten_query: rewritten.into(),
            results: Vec::new(),
            citations: Vec::new(),
            stats: serde_json::Map::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

pub struct RetrievalEngine {
    provider: Arc<dyn CompletionProvider>,
    collections: Vec<Arc<dyn VectorCollection>>,
    rewriter: QueryRewriter,
    threshold: ConfidenceThreshold,
    collection_thresholds: HashMap<String, ConfidenceThreshold>,
    max_documents: usize,
    citations_shown: i32,
    events: Option<Arc<EventBus>>,
}

impl RetrievalEngine {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        collections: Vec<Arc<dyn VectorCollection>>,
        config: &blotter_config::RetrievalConfig,
    ) -> Self {
        let threshold =
            ConfidenceThreshold::from_name(&config.confidence_level).unwrap_or_default();
        let collection_thresholds = config
            .collection_confidence
            .iter()
            .filter_map(|(name, level)| {
                ConfidenceThreshold::from_name(level).map(|t| (name.clone(), t))
            })
            .collect();

        Self {
            rewriter: QueryRewriter::new(provider.clone(), config.query_rewrite),
            provider,
            collections,
            threshold,
            collection_thresholds,
            max_documents: config.max_documents,
            citations_shown: config.citations_shown,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn collections(&self) -> &[Arc<dyn VectorCollection>] {
        &self.collections
    }

    fn threshold_for(&self, collection: &str) -> ConfidenceThreshold {
        self.collection_thresholds
            .get(collection)
            .copied()
            .unwrap_or(self.threshold)
    }

    /// Run one query. Empty results are not an error; callers surface
    /// the configured fallback message on "no matches".
    pub async fn search(
        &self,
        query: &str,
        scope: SearchScope,
        limit: usize,
        history: &[String],
        include_citations: bool,
    ) -> RetrievalOutcome {
        let rewritten = self.rewriter.rewrite(query, history).await;
        let mut outcome = RetrievalOutcome::empty(query, rewritten.clone());

        let vector = match self.provider.embed(&rewritten).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Embedding failed, returning empty outcome");
                outcome
                    .stats
                    .insert("error".into(), format!("embedding failed: {e}").into());
                self.publish(&rewritten, 0, 0, 0);
                return outcome;
            }
        };

        let in_scope: Vec<&Arc<dyn VectorCollection>> = match &scope {
            SearchScope::All => self.collections.iter().collect(),
            SearchScope::Collection(name) => {
                let matched: Vec<_> = self
                    .collections
                    .iter()
                    .filter(|c| c.name() == name)
                    .collect();
                if matched.is_empty() {
                    outcome.stats.insert(
                        "error".into(),
                        format!("unknown collection '{name}'").into(),
                    );
                }
                matched
            }
        };

        let mut searched = 0usize;
        let mut failed = 0usize;
        let mut candidates = 0usize;

        for collection in in_scope {
            let name = collection.name().to_string();
            let scored = match collection.nearest(&vector, limit).await {
                Ok(scored) => scored,
                Err(e) => {
                    warn!(collection = %name, error = %e, "Collection search failed");
                    outcome
                        .stats
                        .insert(format!("{name}_error"), e.to_string().into());
                    failed += 1;
                    continue;
                }
            };
            searched += 1;
            candidates += scored.len();

            let threshold = self.threshold_for(&name);
            for hit in scored {
                let (confidence, passes) = classify(hit.similarity, threshold);
                if !passes {
                    continue;
                }
                let record = hit.record;
                let title = {
                    let t = record.meta_str("title");
                    if t.is_empty() { name.clone() } else { t.to_string() }
                };
                outcome.results.push(SearchResult {
                    source_collection: name.clone(),
                    title,
                    url: record.meta_str("url").to_string(),
                    body: record.text,
                    metadata: record.metadata,
                    similarity: hit.similarity.clamp(0.0, 1.0),
                    confidence,
                });
            }
        }

        // Stable sort: ties keep collection-scan order.
        outcome.results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        outcome.results.truncate(self.max_documents);

        if include_citations {
            outcome.citations = self.build_citations(&outcome.results);
        }

        outcome
            .stats
            .insert("collections_searched".into(), searched.into());
        outcome
            .stats
            .insert("collections_failed".into(), failed.into());
        outcome
            .stats
            .insert("candidates_considered".into(), candidates.into());

        debug!(
            query = %rewritten,
            results = outcome.results.len(),
            searched,
            failed,
            "Search completed"
        );
        self.publish(&rewritten, searched, failed, outcome.results.len());
        outcome
    }

    /// Citations mirror the leading results: -1 = all, 0 = none,
    /// N > 0 = first N in similarity order.
    fn build_citations(&self, results: &[SearchResult]) -> Vec<Citation> {
        let shown = match self.citations_shown {
            0 => 0,
            n if n < 0 => results.len(),
            n => (n as usize).min(results.len()),
        };

        results[..shown]
            .iter()
            .map(|result| Citation {
                title: result.title.clone(),
                source_label: {
                    let s = result
                        .metadata
                        .get("source")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    if s.is_empty() {
                        result.source_collection.clone()
                    } else {
                        s.to_string()
                    }
                },
                url: result.url.clone(),
                confidence: result.confidence,
            })
            .collect()
    }

    fn publish(&self, query: &str, searched: usize, failed: usize, results: usize) {
        if let Some(events) = &self.events {
            events.publish(DomainEvent::SearchCompleted {
                query_preview: query.chars().take(80).collect(),
                collections_searched: searched,
                collections_failed: failed,
                results,
                timestamp: Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::InMemoryCollection;
    use async_trait::async_trait;
    use blotter_core::collection::IndexedRecord;
    use blotter_core::error::{ProviderError, RetrievalError};

    /// Embeds along a fixed axis per keyword so tests control ranking.
    struct AxisEmbedder;

    #[async_trait]
    impl CompletionProvider for AxisEmbedder {
        fn name(&self) -> &str {
            "axis"
        }
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::NotConfigured("embed-only".into()))
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            let mut v = vec![0.0f32; 3];
            if text.contains("tsla") {
                v[0] = 1.0;
            }
            if text.contains("aapl") {
                v[1] = 1.0;
            }
            if text.contains("policy") {
                v[2] = 1.0;
            }
            Ok(v)
        }
        fn dimension(&self) -> usize {
            3
        }
    }

    struct BrokenCollection;

    #[async_trait]
    impl VectorCollection for BrokenCollection {
        fn name(&self) -> &str {
            "communications"
        }
        async fn upsert(&self, _record: IndexedRecord) -> Result<(), RetrievalError> {
            Err(RetrievalError::IndexFailed("offline".into()))
        }
        async fn nearest(
            &self,
            _vector: &[f32],
            _limit: usize,
        ) -> Result<Vec<blotter_core::collection::ScoredRecord>, RetrievalError> {
            Err(RetrievalError::CollectionQueryFailed {
                collection: "communications".into(),
                reason: "offline".into(),
            })
        }
        async fn count(&self) -> Result<usize, RetrievalError> {
            Ok(0)
        }
        async fn clear(&self) -> Result<(), RetrievalError> {
            Ok(())
        }
    }

    fn record(id: &str, vector: Vec<f32>, title: &str) -> IndexedRecord {
        let mut metadata = serde_json::Map::new();
        metadata.insert("title".into(), title.into());
        metadata.insert("url".into(), format!("ledger://{id}").into());
        IndexedRecord {
            id: id.into(),
            vector,
            text: format!("body of {id}"),
            metadata,
        }
    }

    async fn engine_with_trades(
        config: blotter_config::RetrievalConfig,
    ) -> RetrievalEngine {
        let trades = Arc::new(InMemoryCollection::new("trades", 3));
        trades
            .upsert(record("tsla-buy", vec![1.0, 0.0, 0.0], "TSLA buy"))
            .await
            .unwrap();
        trades
            .upsert(record("aapl-sell", vec![0.0, 1.0, 0.0], "AAPL sell"))
            .await
            .unwrap();
        RetrievalEngine::new(Arc::new(AxisEmbedder), vec![trades], &config)
    }

    fn config() -> blotter_config::RetrievalConfig {
        blotter_config::RetrievalConfig {
            query_rewrite: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn matching_record_ranks_first() {
        let engine = engine_with_trades(config()).await;
        let outcome = engine
            .search("tsla", SearchScope::All, 5, &[], true)
            .await;

        assert_eq!(outcome.results[0].title, "TSLA buy");
        assert!(outcome.results[0].similarity > 0.99);
        assert_eq!(outcome.results[0].confidence, ConfidenceLabel::Highest);
        // AAPL record is orthogonal: below the default Low floor.
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn citations_mirror_leading_results() {
        let mut cfg = config();
        cfg.confidence_level = "off".into();
        cfg.citations_shown = 1;
        let engine = engine_with_trades(cfg).await;

        let outcome = engine
            .search("tsla", SearchScope::All, 5, &[], true)
            .await;
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.citations.len(), 1);
        assert_eq!(outcome.citations[0].title, outcome.results[0].title);
        assert_eq!(outcome.citations[0].url, outcome.results[0].url);
    }

    #[tokio::test]
    async fn citations_zero_means_none_and_negative_means_all() {
        let mut cfg = config();
        cfg.confidence_level = "off".into();
        cfg.citations_shown = 0;
        let engine = engine_with_trades(cfg).await;
        let outcome = engine.search("tsla", SearchScope::All, 5, &[], true).await;
        assert!(outcome.citations.is_empty());

        let mut cfg = config();
        cfg.confidence_level = "off".into();
        cfg.citations_shown = -1;
        let engine = engine_with_trades(cfg).await;
        let outcome = engine.search("tsla", SearchScope::All, 5, &[], true).await;
        assert_eq!(outcome.citations.len(), outcome.results.len());
    }

    #[tokio::test]
    async fn partial_collection_failure_is_tolerated() {
        let trades = Arc::new(InMemoryCollection::new("trades", 3));
        trades
            .upsert(record("tsla-buy", vec![1.0, 0.0, 0.0], "TSLA buy"))
            .await
            .unwrap();
        let engine = RetrievalEngine::new(
            Arc::new(AxisEmbedder),
            vec![trades, Arc::new(BrokenCollection)],
            &config(),
        );

        let outcome = engine.search("tsla", SearchScope::All, 5, &[], false).await;
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.stats.contains_key("communications_error"));
        assert_eq!(outcome.stats["collections_failed"], 1);
        assert_eq!(outcome.stats["collections_searched"], 1);
    }

    #[tokio::test]
    async fn embedding_failure_yields_empty_outcome_with_stat() {
        struct NoEmbed;
        #[async_trait]
        impl CompletionProvider for NoEmbed {
            fn name(&self) -> &str {
                "none"
            }
            async fn complete(&self, _p: &str) -> Result<String, ProviderError> {
                Err(ProviderError::NotConfigured("none".into()))
            }
        }

        let trades = Arc::new(InMemoryCollection::new("trades", 3));
        let engine = RetrievalEngine::new(Arc::new(NoEmbed), vec![trades], &config());
        let outcome = engine.search("tsla", SearchScope::All, 5, &[], true).await;

        assert!(outcome.is_empty());
        assert!(outcome.stats.contains_key("error"));
    }

    #[tokio::test]
    async fn scoped_search_hits_only_named_collection() {
        let mut cfg = config();
        cfg.confidence_level = "off".into();
        let engine = engine_with_trades(cfg).await;

        let outcome = engine
            .search(
                "tsla",
                SearchScope::Collection("policy".into()),
                5,
                &[],
                false,
            )
            .await;
        assert!(outcome.is_empty());
        assert!(outcome.stats.contains_key("error"));

        let outcome = engine
            .search(
                "tsla",
                SearchScope::Collection("trades".into()),
                5,
                &[],
                false,
            )
            .await;
        assert!(!outcome.is_empty());
    }

    #[tokio::test]
    async fn per_collection_threshold_override() {
        // Global "off" lets everything through, but the trades override
        // of "highest" filters the orthogonal record out.
        let mut cfg = config();
        cfg.confidence_level = "off".into();
        cfg.collection_confidence
            .insert("trades".into(), "highest".into());
        let engine = engine_with_trades(cfg).await;

        let outcome = engine.search("tsla", SearchScope::All, 5, &[], false).await;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].title, "TSLA buy");
    }

    #[tokio::test]
    async fn results_truncate_to_max_documents() {
        let mut cfg = config();
        cfg.confidence_level = "off".into();
        cfg.max_documents = 1;
        let engine = engine_with_trades(cfg).await;

        let outcome = engine.search("tsla", SearchScope::All, 5, &[], false).await;
        assert_eq!(outcome.results.len(), 1);
    }
}
