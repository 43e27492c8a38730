// Storage error types

use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Update/remove targeted an id with no row
    #[error("Beneficiario {0} not found")]
    NotFound(i64),

    /// Insert with a caller-supplied id that is already taken
    #[error("Beneficiario {0} already exists")]
    Conflict(i64),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type Result<T, E = DbError> = std::result::Result<T, E>;
