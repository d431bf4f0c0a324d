//! Repository error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`TournamentRepository`](super::TournamentRepository)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Store rejected or could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether a pure read may be attempted again.
    ///
    /// Writes are never retried regardless of this flag.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Timeout(_) => true,
            StoreError::Database(sqlx::Error::PoolTimedOut) => true,
            StoreError::Database(sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }
}

/// Result type for repository operations
pub type StoreResult<T> = Result<T, StoreError>;
