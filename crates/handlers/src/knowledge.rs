//! Knowledge-base questions, answered by the retrieval engine with
//! confidence labels and citations attached.

use async_trait::async_trait;
use blotter_core::error::HandlerError;
use blotter_core::handler::{Handler, HandlerReply, TurnContext};
use blotter_retrieval::{RetrievalEngine, RetrievalOutcome, SearchScope};
use std::sync::Arc;

const KNOWLEDGE_WORDS: [&str; 7] = [
    "policy",
    "compliance",
    "procedure",
    "regulation",
    "guideline",
    "suitability",
    "search",
];

pub struct KnowledgeHandler {
    engine: Arc<RetrievalEngine>,
    idk_message: String,
}

impl KnowledgeHandler {
    pub fn new(engine: Arc<RetrievalEngine>, idk_message: impl Into<String>) -> Self {
        Self {
            engine,
            idk_message: idk_message.into(),
        }
    }

    fn format(outcome: &RetrievalOutcome) -> String {
        let mut lines = Vec::new();
        for result in &outcome.results {
            lines.push(format!(
                "[{}] {}: {}",
                result.confidence.as_str(),
                result.title,
                result.body
            ));
        }
        if !outcome.citations.is_empty() {
            lines.push("Sources:".to_string());
            for citation in &outcome.citations {
                lines.push(format!(
                    "  - {} ({}, {}) — confidence: {}",
                    citation.title,
                    citation.source_label,
                    citation.url,
                    citation.confidence.as_str()
                ));
            }
        }
        lines.join("\n")
    }
}

#[async_trait]
impl Handler for KnowledgeHandler {
    fn name(&self) -> &str {
        "knowledge"
    }

    fn can_handle(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        KNOWLEDGE_WORDS.iter().any(|w| lower.contains(w))
    }

    async fn process(&self, query: &str, ctx: &TurnContext) -> Result<HandlerReply, HandlerError> {
        let outcome = self
            .engine
            .search(query, SearchScope::All, 10, &ctx.history, true)
            .await;

        if outcome.is_empty() {
            return Ok(HandlerReply::text(self.idk_message.clone()));
        }

        Ok(HandlerReply::text(Self::format(&outcome)).with_data(serde_json::json!({
            "rewritten_query": outcome.rewritten_query,
            "results": outcome.results.len(),
            "stats": outcome.stats,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blotter_core::collection::VectorCollection;
    use blotter_core::error::ProviderError;
    use blotter_core::CompletionProvider;
    use blotter_retrieval::{Chunker, InMemoryCollection, Indexer, POLICY};

    struct WordEmbedder;

    #[async_trait]
    impl CompletionProvider for WordEmbedder {
        fn name(&self) -> &str {
            "word"
        }
        async fn complete(&self, _p: &str) -> Result<String, ProviderError> {
            Err(ProviderError::NotConfigured("embed-only".into()))
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.contains("suitability") as u8 as f32,
                lower.contains("margin") as u8 as f32,
            ])
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    async fn handler() -> KnowledgeHandler {
        let provider = Arc::new(WordEmbedder);
        let policy = Arc::new(InMemoryCollection::new(POLICY, 2));
        let indexer = Indexer::new(provider.clone(), Chunker::default());
        indexer
            .index_document(
                policy.as_ref(),
                "suitability-policy",
                "Suitability must be assessed before any solicited order.",
            )
            .await
            .unwrap();

        let config = blotter_config::RetrievalConfig {
            query_rewrite: false,
            ..Default::default()
        };
        let engine = Arc::new(RetrievalEngine::new(provider, vec![policy], &config));
        KnowledgeHandler::new(engine, "I don't know. Could you rephrase?")
    }

    #[test]
    fn predicate_matches_policy_questions() {
        let config = blotter_config::RetrievalConfig::default();
        let engine = Arc::new(RetrievalEngine::new(
            Arc::new(WordEmbedder),
            vec![],
            &config,
        ));
        let h = KnowledgeHandler::new(engine, "idk");
        assert!(h.can_handle("what does the suitability policy say"));
        assert!(h.can_handle("search compliance procedures for margin"));
        assert!(!h.can_handle("log a trade for Alice"));
    }

    #[tokio::test]
    async fn hits_come_back_with_confidence_and_citations() {
        let h = handler().await;
        let reply = h
            .process("what is the suitability policy", &TurnContext::default())
            .await
            .unwrap();

        assert!(reply.success);
        assert!(reply.text.contains("Suitability must be assessed"));
        assert!(reply.text.contains("[Highest]"));
        assert!(reply.text.contains("Sources:"));
        assert!(reply.text.contains("doc://"));
    }

    #[tokio::test]
    async fn empty_outcome_returns_the_configured_message() {
        let h = handler().await;
        let reply = h
            .process("margin policy for futures", &TurnContext::default())
            .await
            .unwrap();
        assert_eq!(reply.text, "I don't know. Could you rephrase?");
    }
}
