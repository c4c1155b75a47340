//! Storage error types
//!
//! One error type shared by every backend, so the engine can react to
//! storage failures without knowing which database sits underneath.

use thiserror::Error;

/// Uniform error type for all storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Row addressed by id does not exist
    #[error("not found")]
    NotFound,

    /// Unique constraint violated
    #[error("already exists")]
    AlreadyExists,

    /// Write rejected because it would break a reference
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure (connection, I/O, aborted transaction)
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
