//! CSV-backed trade ledger.
//!
//! One row per logged trade, appended as tickets are logged. The file
//! doubles as the advisor's blotter spreadsheet, so it stays plain CSV
//! with a header row and survives hand edits: malformed rows are
//! skipped with a warning rather than aborting the read.

use async_trait::async_trait;
use blotter_core::error::LedgerError;
use blotter_core::ledger::{LedgerStore, TradeRow};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// A trade ledger stored as a CSV file on disk.
pub struct CsvLedger {
    path: PathBuf,
    // Serializes appends; reads go straight to the file.
    write_lock: Mutex<()>,
}

impl CsvLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_row(&self, row: &TradeRow) -> Result<(), LedgerError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| LedgerError::Storage(format!("write lock poisoned: {e}")))?;

        let exists = self.path.exists()
            && std::fs::metadata(&self.path)
                .map(|m| m.len() > 0)
                .unwrap_or(false);

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::AppendFailed(format!("{}: {e}", self.path.display())))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!exists)
            .from_writer(file);

        writer
            .serialize(row)
            .map_err(|e| LedgerError::AppendFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| LedgerError::AppendFailed(e.to_string()))?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<TradeRow>, LedgerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| LedgerError::Storage(format!("{}: {e}", self.path.display())))?;

        let mut rows = Vec::new();
        for (index, result) in reader.deserialize::<TradeRow>().enumerate() {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => {
                    // Header is line 1, so data row N is line N+1.
                    warn!(row = index + 2, error = %e, "Skipping malformed ledger row");
                }
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl LedgerStore for CsvLedger {
    async fn append(&self, row: &TradeRow) -> Result<(), LedgerError> {
        self.append_row(row)
    }

    async fn all(&self) -> Result<Vec<TradeRow>, LedgerError> {
        self.read_all()
    }
}
