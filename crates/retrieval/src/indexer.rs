//! Indexing pipelines: ledger rows, policy documents, and sent
//! communications into their vector collections.

use blotter_core::collection::{IndexedRecord, VectorCollection};
use blotter_core::error::RetrievalError;
use blotter_core::ledger::TradeRow;
use blotter_core::CompletionProvider;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::chunker::Chunker;

/// Canonical collection names, in scan order.
pub const TRADES: &str = "trades";
pub const COMMUNICATIONS: &str = "communications";
pub const POLICY: &str = "policy";

pub struct Indexer {
    provider: Arc<dyn CompletionProvider>,
    chunker: Chunker,
}

impl Indexer {
    pub fn new(provider: Arc<dyn CompletionProvider>, chunker: Chunker) -> Self {
        Self { provider, chunker }
    }

    /// Index ledger rows into the trades collection, one record per
    /// row keyed by ticket id (re-runs replace, never duplicate).
    pub async fn index_trades(
        &self,
        collection: &dyn VectorCollection,
        rows: &[TradeRow],
    ) -> Result<usize, RetrievalError> {
        let mut indexed = 0usize;
        for row in rows {
            let text = row.index_sentence();
            let vector = self
                .provider
                .embed(&text)
                .await
                .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

            let mut metadata = serde_json::Map::new();
            metadata.insert("title".into(), format!("{} — {}", row.ticker, row.client).into());
            metadata.insert("url".into(), format!("ledger://{}", row.ticket_id).into());
            metadata.insert("source".into(), "trade ledger".into());
            metadata.insert("client".into(), row.client.clone().into());
            metadata.insert("ticker".into(), row.ticker.clone().into());
            metadata.insert("side".into(), row.side.to_string().into());
            metadata.insert("quantity".into(), row.quantity.into());

            collection
                .upsert(IndexedRecord {
                    id: row.ticket_id.clone(),
                    vector,
                    text,
                    metadata,
                })
                .await?;
            indexed += 1;
        }
        info!(count = indexed, collection = collection.name(), "Indexed ledger rows");
        Ok(indexed)
    }

    /// Chunk a document and index every chunk into the policy
    /// collection. Returns the number of chunks stored.
    pub async fn index_document(
        &self,
        collection: &dyn VectorCollection,
        title: &str,
        text: &str,
    ) -> Result<usize, RetrievalError> {
        let chunks = self.chunker.chunk(text, title);
        for chunk in &chunks {
            let vector = self
                .provider
                .embed(&chunk.text)
                .await
                .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

            let mut metadata = serde_json::Map::new();
            metadata.insert(
                "title".into(),
                format!("{} (part {})", chunk.title, chunk.sequence_index + 1).into(),
            );
            metadata.insert(
                "url".into(),
                format!("doc://{}#{}", chunk.title, chunk.sequence_index).into(),
            );
            metadata.insert("source".into(), "policy documents".into());
            metadata.insert("sequence_index".into(), chunk.sequence_index.into());

            collection
                .upsert(IndexedRecord {
                    id: format!("{}#{}", chunk.title, chunk.sequence_index),
                    vector,
                    text: chunk.text.clone(),
                    metadata,
                })
                .await?;
        }
        info!(
            count = chunks.len(),
            title, collection = collection.name(),
            "Indexed document chunks"
        );
        Ok(chunks.len())
    }

    /// Append a sent message to the communications collection.
    pub async fn index_communication(
        &self,
        collection: &dyn VectorCollection,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), RetrievalError> {
        let text = format!("Email to {recipient} — {subject}: {body}");
        let vector = self
            .provider
            .embed(&text)
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let mut metadata = serde_json::Map::new();
        metadata.insert("title".into(), subject.into());
        metadata.insert("url".into(), format!("mail://{id}").into());
        metadata.insert("source".into(), "communications".into());
        metadata.insert("recipient".into(), recipient.into());

        collection
            .upsert(IndexedRecord {
                id,
                vector,
                text,
                metadata,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::InMemoryCollection;
    use async_trait::async_trait;
    use blotter_core::error::ProviderError;
    use blotter_core::ledger::Side;

    /// Counts words into a constant-dimension vector; enough to verify
    /// indexing plumbing without a real embedder.
    struct TinyEmbedder;

    #[async_trait]
    impl CompletionProvider for TinyEmbedder {
        fn name(&self) -> &str {
            "tiny"
        }
        async fn complete(&self, _p: &str) -> Result<String, ProviderError> {
            Err(ProviderError::NotConfigured("embed-only".into()))
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![text.split_whitespace().count() as f32, 1.0])
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    fn indexer() -> Indexer {
        Indexer::new(Arc::new(TinyEmbedder), Chunker::new(12, 0.1))
    }

    #[tokio::test]
    async fn trades_index_one_record_per_row() {
        let collection = InMemoryCollection::new(TRADES, 2);
        let rows = vec![
            TradeRow::new("Alice Johnson", Side::Buy, "TSLA", 100),
            TradeRow::new("Bob Lee", Side::Sell, "AAPL", 50),
        ];

        let count = indexer().index_trades(&collection, &rows).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(collection.count().await.unwrap(), 2);

        // Re-indexing the same rows replaces instead of duplicating.
        indexer().index_trades(&collection, &rows).await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn trade_metadata_carries_client_and_ticker() {
        let collection = InMemoryCollection::new(TRADES, 2);
        let rows = vec![TradeRow::new("Alice Johnson", Side::Buy, "TSLA", 100)];
        indexer().index_trades(&collection, &rows).await.unwrap();

        let hits = collection.nearest(&[1.0, 1.0], 1).await.unwrap();
        let record = &hits[0].record;
        assert_eq!(record.meta_str("client"), "Alice Johnson");
        assert_eq!(record.meta_str("ticker"), "TSLA");
        assert!(record.meta_str("url").starts_with("ledger://"));
        assert!(record.text.contains("Client Alice Johnson traded 100 shares of TSLA"));
    }

    #[tokio::test]
    async fn documents_index_chunk_by_chunk() {
        let collection = InMemoryCollection::new(POLICY, 2);
        let text = (0..8)
            .map(|i| format!("Policy clause {i} states an obligation."))
            .collect::<Vec<_>>()
            .join(" ");

        let count = indexer()
            .index_document(&collection, "suitability", &text)
            .await
            .unwrap();
        assert!(count > 1);
        assert_eq!(collection.count().await.unwrap(), count);

        let hits = collection.nearest(&[5.0, 1.0], 1).await.unwrap();
        assert!(hits[0].record.meta_str("title").contains("suitability"));
    }

    #[tokio::test]
    async fn communications_append() {
        let collection = InMemoryCollection::new(COMMUNICATIONS, 2);
        indexer()
            .index_communication(&collection, "alice@example.com", "Trade confirm", "Filled.")
            .await
            .unwrap();
        assert_eq!(collection.count().await.unwrap(), 1);

        let hits = collection.nearest(&[1.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].record.meta_str("title"), "Trade confirm");
        assert_eq!(hits[0].record.meta_str("recipient"), "alice@example.com");
    }
}
