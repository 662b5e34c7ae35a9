//! Best-effort query rewriting.
//!
//! Follow-up questions ("what about his other trades?") retrieve badly
//! as-is. The rewriter asks the completion collaborator to rephrase the
//! query into a self-contained search string using a short window of
//! history. Any failure falls back to the original query; this
//! component never errors to its caller.

use blotter_core::CompletionProvider;
use std::sync::Arc;
use tracing::debug;

const HISTORY_WINDOW: usize = 3;

pub struct QueryRewriter {
    provider: Arc<dyn CompletionProvider>,
    enabled: bool,
}

impl QueryRewriter {
    pub fn new(provider: Arc<dyn CompletionProvider>, enabled: bool) -> Self {
        Self { provider, enabled }
    }

    /// Rewrite `query` into a self-contained search string, or return
    /// it unchanged when disabled, history is empty, or the
    /// collaborator fails.
    pub async fn rewrite(&self, query: &str, history: &[String]) -> String {
        if !self.enabled || history.is_empty() {
            return query.to_string();
        }

        let prompt = Self::build_prompt(query, history);
        match self.provider.complete(&prompt).await {
            Ok(rewritten) => {
                let rewritten = rewritten.trim();
                if rewritten.is_empty() {
                    query.to_string()
                } else {
                    debug!(original = %query, rewritten = %rewritten, "Query rewritten");
                    rewritten.to_string()
                }
            }
            Err(e) => {
                debug!(error = %e, "Query rewrite unavailable, using original query");
                query.to_string()
            }
        }
    }

    fn build_prompt(query: &str, history: &[String]) -> String {
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let window = history[start..]
            .iter()
            .map(|turn| format!("- {turn}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Given this conversation history:\n{window}\n\n\
             Rewrite the following question as a single self-contained search query, \
             replacing pronouns and vague references with the concrete names and terms \
             they refer to. Reply with the query only.\n\nQuestion: {query}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use blotter_core::error::ProviderError;

    struct FixedProvider(&'static str);

    #[async_trait]
    impl CompletionProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
        }
    }

    fn history(turns: &[&str]) -> Vec<String> {
        turns.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn disabled_returns_original() {
        let rewriter = QueryRewriter::new(Arc::new(FixedProvider("rewritten")), false);
        let out = rewriter
            .rewrite("what about him?", &history(&["show Bob's trades"]))
            .await;
        assert_eq!(out, "what about him?");
    }

    #[tokio::test]
    async fn empty_history_returns_original() {
        let rewriter = QueryRewriter::new(Arc::new(FixedProvider("rewritten")), true);
        assert_eq!(rewriter.rewrite("TSLA trades", &[]).await, "TSLA trades");
    }

    #[tokio::test]
    async fn collaborator_output_is_trimmed() {
        let rewriter = QueryRewriter::new(Arc::new(FixedProvider("  Bob Lee AAPL trades \n")), true);
        let out = rewriter
            .rewrite("what about him?", &history(&["show Bob's trades"]))
            .await;
        assert_eq!(out, "Bob Lee AAPL trades");
    }

    #[tokio::test]
    async fn empty_collaborator_output_falls_back() {
        let rewriter = QueryRewriter::new(Arc::new(FixedProvider("   ")), true);
        let out = rewriter
            .rewrite("what about him?", &history(&["show Bob's trades"]))
            .await;
        assert_eq!(out, "what about him?");
    }

    #[tokio::test]
    async fn collaborator_failure_falls_back() {
        let rewriter = QueryRewriter::new(Arc::new(FailingProvider), true);
        let out = rewriter
            .rewrite("what about him?", &history(&["show Bob's trades"]))
            .await;
        assert_eq!(out, "what about him?");
    }

    #[test]
    fn prompt_uses_at_most_last_three_turns() {
        let turns = history(&["one", "two", "three", "four", "five"]);
        let prompt = QueryRewriter::build_prompt("q", &turns);
        assert!(!prompt.contains("- one"));
        assert!(!prompt.contains("- two"));
        assert!(prompt.contains("- three"));
        assert!(prompt.contains("- four"));
        assert!(prompt.contains("- five"));
    }
}
