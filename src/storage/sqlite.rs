//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Persister trait.
//! The connection lives behind a mutex and every statement runs on the
//! blocking thread pool.

use crate::state::Review;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{check_key, Persister, StorageError, StorageResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const UPSERT_SQL: &str = "INSERT INTO reviews (id, payload, album_count) VALUES (?1, ?2, ?3)
     ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, album_count = excluded.album_count";

/// SQLite output backend
pub struct SqlitePersister {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqlitePersister {
    /// Opens or creates the database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqlitePersister)` - Database opened and schema in place
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Reads a stored review back, `None` if it was never written
    pub fn load(&self, id: &str) -> StorageResult<Option<Review>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM reviews WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Number of stored reviews
    pub fn count(&self) -> StorageResult<u64> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl Persister for SqlitePersister {
    async fn persist(&self, id: &str, review: &Review) -> StorageResult<()> {
        check_key(id)?;

        let payload = serde_json::to_string(review)?;
        let album_count = review.albums.len() as i64;
        let id = id.to_string();
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> StorageResult<()> {
            let conn = conn.lock().map_err(|_| StorageError::Poisoned)?;
            conn.execute(UPSERT_SQL, params![id, payload, album_count])?;
            tracing::debug!("Saved review {} to database", id);
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Join(e.to_string()))?
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("SQLite database {}", path.display()),
            None => "in-memory SQLite database".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Album;
    use tempfile::TempDir;

    fn sample_review(id: &str, albums: usize) -> Review {
        Review {
            id: id.to_string(),
            albums: (0..albums)
                .map(|i| Album {
                    title: format!("Album {}", i),
                    ..Album::default()
                })
                .collect(),
            authors: vec!["Author".to_string()],
            ..Review::default()
        }
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let persister = SqlitePersister::open_in_memory().unwrap();
        let review = sample_review("1-a", 2);

        persister.persist("1-a", &review).await.unwrap();

        assert_eq!(persister.load("1-a").unwrap(), Some(review));
        assert_eq!(persister.load("2-b").unwrap(), None);
        assert_eq!(persister.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persist_twice_is_identical() {
        let persister = SqlitePersister::open_in_memory().unwrap();
        let review = sample_review("1-a", 1);

        persister.persist("1-a", &review).await.unwrap();
        let first = persister.load("1-a").unwrap();
        persister.persist("1-a", &review).await.unwrap();
        let second = persister.load("1-a").unwrap();

        assert_eq!(first, second);
        assert_eq!(persister.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_payload() {
        let persister = SqlitePersister::open_in_memory().unwrap();

        persister.persist("1-a", &sample_review("1-a", 1)).await.unwrap();
        persister.persist("1-a", &sample_review("1-a", 3)).await.unwrap();

        let stored = persister.load("1-a").unwrap().unwrap();
        assert_eq!(stored.albums.len(), 3);
        assert_eq!(persister.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_unsafe_key() {
        let persister = SqlitePersister::open_in_memory().unwrap();
        let result = persister.persist("", &sample_review("", 1)).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.db");

        {
            let persister = SqlitePersister::open(&path).unwrap();
            persister.persist("1-a", &sample_review("1-a", 1)).await.unwrap();
        }

        let reopened = SqlitePersister::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert!(reopened.describe().contains("reviews.db"));
    }
}
