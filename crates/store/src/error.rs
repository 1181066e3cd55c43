use common::Version;
use thiserror::Error;

/// Errors that can occur when interacting with the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given id.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A record with the same unique key already exists.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// The record was modified since it was read.
    /// The compare-and-swap on its version failed.
    #[error("version conflict for {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: String,
        expected: Version,
        actual: Version,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
