//! Error types for the store crate.

use thiserror::Error;

/// Errors that can occur in the store crate.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A vector does not have the store's dimensionality.
    #[error("Embedding has {got} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Invalid data or state.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
