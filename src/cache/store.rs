//! On-disk persistence for named caches
//!
//! One JSON file per named cache under a base directory, default
//! `~/.cache/container-processing`. Files are written to a temporary
//! sibling and renamed into place, so a crash mid-save leaves at most the
//! file being written behind in a partial state.

use crate::error::{LineageError, LineageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Directory holding persisted caches
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `dir` (created lazily on save)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Per-user default cache directory
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("container-processing")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the cache called `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Load the cache called `name`
    ///
    /// Returns `Ok(None)` when no file exists, and `CacheLoad` when a file
    /// exists but cannot be read or decoded.
    pub async fn load<C: DeserializeOwned>(&self, name: &str) -> LineageResult<Option<C>> {
        let path = self.path_for(name);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No persisted cache at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(LineageError::CacheLoad {
                    name: name.to_string(),
                    path,
                    reason: e.to_string(),
                })
            }
        };

        let cache = serde_json::from_slice(&content).map_err(|e| LineageError::CacheLoad {
            name: name.to_string(),
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Some(cache))
    }

    /// Persist `cache` under `name`, replacing any previous file
    pub async fn save<C: Serialize>(&self, name: &str, cache: &C) -> LineageResult<()> {
        let path = self.path_for(name);
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| LineageError::cache_save(name, self.dir.clone(), e))?;

        let content = serde_json::to_vec(cache)?;
        let tmp_path = self.dir.join(format!(".{}.tmp", name));

        fs::write(&tmp_path, content)
            .await
            .map_err(|e| LineageError::cache_save(name, tmp_path.clone(), e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| LineageError::cache_save(name, path.clone(), e))?;

        debug!("Saved cache {} to {}", name, path.display());
        Ok(())
    }

    /// Delete the files of the named caches; returns how many existed
    pub async fn remove(&self, names: &[&str]) -> LineageResult<usize> {
        let mut removed = 0;
        for name in names {
            let path = self.path_for(name);
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(LineageError::io(
                        format!("removing cache file {}", path.display()),
                        e,
                    ))
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoundedCache, LruCache};
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());

        let loaded: Option<LruCache<i64, String>> = store.load("build_id_to_nvr").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_creates_directory_and_roundtrips() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().join("nested").join("cache"));

        let mut cache = LruCache::new(8);
        cache.set(100_i64, "foo-container-1.0-1".to_string());
        store.save("build_id_to_nvr", &cache).await.unwrap();

        let loaded: LruCache<i64, String> = store.load("build_id_to_nvr").await.unwrap().unwrap();
        assert_eq!(loaded.peek(&100), Some(&"foo-container-1.0-1".to_string()));
        assert_eq!(loaded.capacity(), 8);
        assert!(!store.dir().join(".build_id_to_nvr.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_load_error() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());
        std::fs::write(store.path_for("build_data"), b"not json").unwrap();

        let err = store
            .load::<LruCache<i64, String>>("build_data")
            .await
            .unwrap_err();
        assert!(matches!(err, LineageError::CacheLoad { ref name, .. } if name == "build_data"));
    }

    #[tokio::test]
    async fn unreadable_path_is_a_load_error() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());
        std::fs::create_dir(store.path_for("task_results")).unwrap();

        let err = store
            .load::<LruCache<i64, i64>>("task_results")
            .await
            .unwrap_err();
        assert!(matches!(err, LineageError::CacheLoad { ref name, .. } if name == "task_results"));
    }

    #[tokio::test]
    async fn missing_directory_loads_and_removes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().join("never-created"));

        let loaded: Option<LruCache<i64, i64>> = store.load("build_data").await.unwrap();
        assert!(loaded.is_none());
        assert_eq!(store.remove(&["build_data", "task_results"]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn save_overwrites_previous_contents() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());

        let mut cache = LruCache::new(4);
        cache.set(1_i64, 10_i64);
        store.save("nvr_to_build_id", &cache).await.unwrap();
        cache.clear();
        cache.set(2, 20);
        store.save("nvr_to_build_id", &cache).await.unwrap();

        let loaded: LruCache<i64, i64> = store.load("nvr_to_build_id").await.unwrap().unwrap();
        assert!(!loaded.contains(&1));
        assert!(loaded.contains(&2));
    }

    #[tokio::test]
    async fn remove_counts_existing_files() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());
        store.save("task_results", &LruCache::<i64, i64>::new(1)).await.unwrap();

        let removed = store.remove(&["task_results", "build_data"]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!store.path_for("task_results").exists());
    }
}
