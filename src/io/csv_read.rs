use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Result, SyncError};

/// The raw contents of one tabular input: the header row plus every data
/// row, kept as string records so failed rows can be written back out with
/// their original field order and content intact.
#[derive(Debug, Clone)]
pub struct RowSet {
    pub headers: csv::StringRecord,
    pub records: Vec<csv::StringRecord>,
}

impl RowSet {
    /// Deserializes one raw record into a typed row using the file's
    /// headers. Unknown columns are ignored and missing ones default, so
    /// operator-extended files keep working.
    pub fn typed<T: DeserializeOwned>(&self, record: &csv::StringRecord) -> Result<T> {
        Ok(record.deserialize(Some(&self.headers))?)
    }
}

/// Reads a CSV file whose first row is the header. A missing file is
/// reported as [`SyncError::MissingInput`] so batches can distinguish it
/// from a malformed one.
pub fn read_rows(path: &Path) -> Result<RowSet> {
    if !path.exists() {
        return Err(SyncError::MissingInput(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    Ok(RowSet { headers, records })
}
