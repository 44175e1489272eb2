//! JSON directory storage: one pretty-printed `<id>.json` file per review

use crate::state::Review;
use crate::storage::traits::{check_key, Persister, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

/// Writes each review to its own file inside a directory
#[derive(Debug)]
pub struct JsonDirPersister {
    dir: PathBuf,

    /// Makes temp file names unique across concurrent writers
    next_tmp: AtomicU64,
}

impl JsonDirPersister {
    /// Opens (and creates if needed) the output directory
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory receiving the review files
    ///
    /// # Returns
    ///
    /// * `Ok(JsonDirPersister)` - Directory exists and is ready
    /// * `Err(StorageError)` - The directory could not be created
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            next_tmp: AtomicU64::new(0),
        })
    }

    /// File holding the review `id`
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Fresh temp file name, short and independent of the review id so it fits
    /// wherever `<id>.json` fits
    fn temp_path(&self) -> PathBuf {
        let n = self.next_tmp.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(".pitchfork-{}-{}.tmp", std::process::id(), n))
    }

    /// Reads a stored review back, `None` if it was never written
    pub async fn load(&self, id: &str) -> StorageResult<Option<Review>> {
        check_key(id)?;

        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Persister for JsonDirPersister {
    async fn persist(&self, id: &str, review: &Review) -> StorageResult<()> {
        check_key(id)?;

        let bytes = serde_json::to_vec_pretty(review)?;
        let tmp = self.temp_path();
        let target = self.path_for(id);

        // Readers see either the old file or the new one, never a partial write
        if let Err(e) = write_then_rename(&tmp, &target, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!("Saved review {} to {}", id, target.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("JSON files in {}", self.dir.display())
    }
}

async fn write_then_rename(tmp: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp, target).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Album;
    use crate::storage::StorageError;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample_review(id: &str) -> Review {
        Review {
            id: id.to_string(),
            albums: vec![Album {
                artists: vec!["Frank Ocean".to_string()],
                title: "Blonde".to_string(),
                score: "9.0".to_string(),
                labels: vec!["Boys Don't Cry".to_string()],
                year: "2016".to_string(),
            }],
            authors: vec!["Ryan Dombal".to_string()],
            genres: vec!["Pop/R&B".to_string()],
            article: "First.\n\nSecond.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let persister = JsonDirPersister::open(dir.path()).unwrap();
        let review = sample_review("22735-blonde");

        persister.persist("22735-blonde", &review).await.unwrap();

        assert!(dir.path().join("22735-blonde.json").exists());
        assert_eq!(persister.load("22735-blonde").await.unwrap(), Some(review));
        assert_eq!(persister.load("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persist_twice_is_identical() {
        let dir = TempDir::new().unwrap();
        let persister = JsonDirPersister::open(dir.path()).unwrap();
        let review = sample_review("1-a");
        let path = persister.path_for("1-a");

        persister.persist("1-a", &review).await.unwrap();
        let first = std::fs::read(&path).unwrap();

        persister.persist("1-a", &review).await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);

        // No temp files left behind
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("reviews");

        let persister = JsonDirPersister::open(&nested).unwrap();
        persister.persist("1-a", &sample_review("1-a")).await.unwrap();

        assert!(nested.join("1-a.json").exists());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_key() {
        let dir = TempDir::new().unwrap();
        let persister = JsonDirPersister::open(dir.path()).unwrap();

        let result = persister.persist("../escape", &sample_review("x")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let persister = Arc::new(JsonDirPersister::open(dir.path()).unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let persister = Arc::clone(&persister);
            handles.push(tokio::spawn(async move {
                let id = format!("{}-album", i);
                persister.persist(&id, &sample_review(&id)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 16);
    }

    #[tokio::test]
    async fn test_longest_file_name_id() {
        let dir = TempDir::new().unwrap();
        let persister = JsonDirPersister::open(dir.path()).unwrap();

        // "<id>.json" is exactly 255 bytes, the usual file name limit
        let id = "a".repeat(250);
        persister.persist(&id, &sample_review(&id)).await.unwrap();

        assert!(persister.path_for(&id).exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
