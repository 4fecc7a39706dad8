use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::io::csv_write;

/// Column appended to every failure row.
pub const LOG_ERROR_COLUMN: &str = "logError";

/// Accumulates the rows one batch failed to apply, each with a diagnostic,
/// and writes them back out for operator retry. Original field order and
/// content are preserved; an empty ledger writes nothing.
#[derive(Debug)]
pub struct FailureLedger {
    headers: csv::StringRecord,
    failures: Vec<(csv::StringRecord, String)>,
}

impl FailureLedger {
    /// Creates an empty ledger for a batch whose input carried the given
    /// header row.
    pub fn new(headers: csv::StringRecord) -> Self {
        Self {
            headers,
            failures: Vec::new(),
        }
    }

    /// Records one failed row with its error description.
    pub fn record(&mut self, row: csv::StringRecord, error: impl Into<String>) {
        self.failures.push((row, error.into()));
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether the batch completed without failures.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Writes the failure file if anything was recorded, returning the path
    /// actually written. An empty ledger produces no file.
    pub fn flush_if_nonempty(&self, path: &Path) -> Result<Option<PathBuf>> {
        if self.failures.is_empty() {
            return Ok(None);
        }
        csv_write::write_failures(path, &self.headers, &self.failures)?;
        warn!(
            failed = self.failures.len(),
            file = %path.display(),
            "failed rows written for retry"
        );
        Ok(Some(path.to_path_buf()))
    }
}
