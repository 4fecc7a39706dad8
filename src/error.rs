use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type covering the different failure cases that can occur while the
/// tool authenticates, reads tabular input, or talks to the marketplace.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the CSV reader or writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Transport-level HTTP failures (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A non-2xx response from the marketplace, carrying the best available
    /// diagnostic text from the response body.
    #[error("remote error: {message}")]
    Remote { message: String },

    /// Raised when the login endpoint rejects the supplied credentials.
    #[error("login rejected: {0}")]
    Auth(String),

    /// Raised when a batch requires an input file that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the upsert response does not carry the item identifier
    /// needed for the stock follow-up call.
    #[error("could not attach stock: upsert response carried no itemID")]
    MissingItemId,

    /// Raised when an update row declares no parseable availability status
    /// and the stock override does not apply.
    #[error("row has no parseable availableStatus")]
    MissingStatus,

    /// Raised when the operator picks a menu entry that does not exist.
    #[error("invalid menu choice: {0}")]
    InvalidChoice(String),

    /// Raised when the operator supplies a markup percentage that is not a
    /// whole number.
    #[error("invalid markup percent: {0}")]
    InvalidPercent(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
