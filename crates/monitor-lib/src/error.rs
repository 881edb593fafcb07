//! Typed errors for the persistence and history seams

use thiserror::Error;

/// Error returned by the history, anomaly and alert store seams
///
/// Persistence failures are never fatal to ingestion: the pipeline logs
/// them per record and keeps processing siblings.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation
    #[error("store backend failure: {0}")]
    Backend(String),

    /// A referenced record does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    /// Stored data could not be interpreted
    #[error("malformed stored data: {0}")]
    Malformed(String),
}
