//! Core error types.

use thiserror::Error;

/// Infrastructure errors of the plan store and its encodings.
///
/// Object-level migration failures are not errors in this sense: they are
/// contained by the executor and recorded on the owning record's message
/// sequence. Only failures of the storage layer itself escalate.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// No migration record exists for the given database.
    #[error("unknown database: {0}")]
    UnknownDatabase(String),

    /// No inventory snapshot exists for the given database.
    #[error("no inventory snapshot for database: {0}")]
    MissingSnapshot(String),

    /// Rejected bounded-field plan edit.
    #[error("plan edit rejected: {0}")]
    EditRejected(String),

    /// A run worker thread failed.
    #[error("worker failed: {0}")]
    Worker(String),

    /// Invalid persisted data.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
