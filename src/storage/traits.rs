//! Persister trait and error types
//!
//! This module defines the interface every output backend implements and
//! the errors a backend can report.

use crate::state::Review;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while writing or reading a review
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The identifier cannot be used as a file name or key
    #[error("Invalid review key: {0:?}")]
    InvalidKey(String),

    #[error("Database lock poisoned")]
    Poisoned,

    #[error("Blocking task failed: {0}")]
    Join(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable output for reviews, keyed by review identifier
///
/// Implementations are called concurrently from every review worker, each
/// with a distinct identifier. Persisting the same identifier and review twice
/// must leave the same stored artifact.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Writes `review` under `id`, replacing any earlier version
    ///
    /// # Arguments
    ///
    /// * `id` - Review identifier; must be key-safe
    /// * `review` - The record to store
    async fn persist(&self, id: &str, review: &Review) -> StorageResult<()>;

    /// Human-readable destination, for logs
    fn describe(&self) -> String;
}

/// Rejects identifiers that are unusable as a file name or key
pub fn check_key(id: &str) -> StorageResult<()> {
    if crate::url::is_key_safe(id) {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("22735-blonde").is_ok());

        for bad in ["", ".", "..", "a/b", "a\\b", "a\0b"] {
            assert!(
                matches!(check_key(bad), Err(StorageError::InvalidKey(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
