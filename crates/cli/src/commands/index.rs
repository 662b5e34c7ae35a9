//! `blotter index` — Index a document into the policy collection, or
//! re-index the ledger.
//!
//! Collections live in memory, so this is primarily a validation run:
//! it reports how the input chunks and embeds with the current config.
//! `serve` performs the same indexing at startup.

use crate::app::App;
use blotter_config::AppConfig;
use blotter_core::VectorCollection;
use blotter_core::ledger::LedgerStore;
use blotter_retrieval::POLICY;

pub async fn run(config: AppConfig, file: Option<String>) -> anyhow::Result<()> {
    let app = App::build(config).await?;

    match file {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
            let title = std::path::Path::new(&path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document")
                .to_string();

            let policy = app
                .engine
                .collections()
                .iter()
                .find(|c| c.name() == POLICY)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("policy collection missing"))?;

            let chunks = app.indexer.index_document(policy.as_ref(), &title, &text).await?;
            println!("Indexed '{title}': {chunks} chunks into the policy collection.");
        }
        None => {
            // App::build already indexed the ledger; report the result.
            let rows = app.ledger.all().await?;
            println!(
                "Ledger at {}: {} rows indexed into the trades collection.",
                app.config.ledger.csv_path,
                rows.len()
            );
        }
    }

    Ok(())
}
