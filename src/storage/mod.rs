//! Storage module for persisting reviews
//!
//! This module handles writing extracted reviews to their destination:
//! - One pretty-printed JSON file per review in a directory
//! - One row per review in a SQLite database
//!
//! Both backends are keyed by review identifier and overwrite in place.

mod json;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonDirPersister;
pub use sqlite::SqlitePersister;
pub use traits::{check_key, Persister, StorageError, StorageResult};

use crate::config::{OutputConfig, OutputFormat};
use std::sync::Arc;

/// Opens the backend selected by the output configuration
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn Persister>)` - Destination is ready for writes
/// * `Err(StorageError)` - The directory or database could not be opened
pub fn open_persister(config: &OutputConfig) -> StorageResult<Arc<dyn Persister>> {
    let persister: Arc<dyn Persister> = match config.format {
        OutputFormat::Json => Arc::new(JsonDirPersister::open(&config.directory)?),
        OutputFormat::Sqlite => Arc::new(SqlitePersister::open(&config.database_path)?),
    };

    tracing::info!("Writing reviews to {}", persister.describe());
    Ok(persister)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_persister_by_format() {
        let dir = TempDir::new().unwrap();

        let json = OutputConfig {
            format: OutputFormat::Json,
            directory: dir.path().join("reviews"),
            database_path: dir.path().join("unused.db"),
        };
        let persister = open_persister(&json).unwrap();
        assert!(persister.describe().starts_with("JSON"));
        assert!(dir.path().join("reviews").is_dir());

        let sqlite = OutputConfig {
            format: OutputFormat::Sqlite,
            ..json
        };
        let persister = open_persister(&sqlite).unwrap();
        assert!(persister.describe().starts_with("SQLite"));
        assert!(dir.path().join("unused.db").exists());
    }
}
