//! Local mirror of list results, keyed by name and stamped with the time they
//! were written.
//!
//! Reads and writes never fail the caller: storage problems are logged and
//! treated as a miss.

use std::{
    collections::HashMap,
    fs,
    marker::PhantomData,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

/// Raw key/value persistence behind a [`CacheMirror`].
pub trait CacheStorage: Send + Sync {
    fn load(&self, key: &str) -> std::io::Result<Option<String>>;
    fn store(&self, key: &str, value: &str) -> std::io::Result<()>;
    fn remove(&self, key: &str) -> std::io::Result<()>;
}

#[derive(Default)]
pub struct MemoryCacheStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl CacheStorage for MemoryCacheStorage {
    fn load(&self, key: &str) -> std::io::Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per entry under `dir`.
pub struct FileCacheStorage {
    dir: PathBuf,
}

impl FileCacheStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Per-user cache directory, falling back to the working directory.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pm_client")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl CacheStorage for FileCacheStorage {
    fn load(&self, key: &str) -> std::io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn store(&self, key: &str, value: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    data: T,
    /// Epoch milliseconds.
    timestamp: i64,
}

pub struct CacheMirror<T> {
    key: String,
    storage: Arc<dyn CacheStorage>,
    _data: PhantomData<fn() -> T>,
}

impl<T> Clone for CacheMirror<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            storage: self.storage.clone(),
            _data: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> CacheMirror<T> {
    pub fn new(key: impl Into<String>, storage: Arc<dyn CacheStorage>) -> Self {
        Self {
            key: key.into(),
            storage,
            _data: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn read(&self, max_age: Duration) -> Option<T> {
        self.read_at(max_age, Utc::now())
    }

    /// Returns the entry when it is no older than `max_age` at `now`. Stale
    /// entries are removed; an entry stamped in the future counts as fresh.
    pub fn read_at(&self, max_age: Duration, now: DateTime<Utc>) -> Option<T> {
        let raw = match self.storage.load(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %self.key, "cache: read failed: {err}");
                return None;
            }
        };
        let entry: Stamped<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key = %self.key, "cache: discarding unreadable entry: {err}");
                self.clear();
                return None;
            }
        };
        let age_ms = now.timestamp_millis() - entry.timestamp;
        let max_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        if age_ms > max_ms {
            debug!(key = %self.key, age_ms, "cache: entry expired");
            self.clear();
            return None;
        }
        Some(entry.data)
    }

    pub fn write(&self, data: &T) {
        self.write_at(data, Utc::now());
    }

    pub fn write_at(&self, data: &T, now: DateTime<Utc>) {
        let entry = Stamped {
            data,
            timestamp: now.timestamp_millis(),
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %self.key, "cache: failed to encode entry: {err}");
                return;
            }
        };
        if let Err(err) = self.storage.store(&self.key, &raw) {
            warn!(key = %self.key, "cache: write failed: {err}");
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.storage.remove(&self.key) {
            warn!(key = %self.key, "cache: clear failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn mirror(storage: Arc<dyn CacheStorage>) -> CacheMirror<Vec<String>> {
        CacheMirror::new("users", storage)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("timestamp")
    }

    #[test]
    fn fresh_entries_are_returned() {
        let cache = mirror(Arc::new(MemoryCacheStorage::default()));
        cache.write_at(&vec!["ada".to_string()], at(0));
        assert_eq!(
            cache.read_at(Duration::from_secs(60), at(30)),
            Some(vec!["ada".to_string()])
        );
    }

    #[test]
    fn stale_entries_are_removed() {
        let storage = Arc::new(MemoryCacheStorage::default());
        let cache = mirror(storage.clone());
        cache.write_at(&vec!["ada".to_string()], at(0));
        assert_eq!(cache.read_at(Duration::from_secs(60), at(61)), None);
        assert_eq!(storage.load("users").expect("load"), None);
    }

    #[test]
    fn future_stamps_count_as_fresh() {
        let cache = mirror(Arc::new(MemoryCacheStorage::default()));
        cache.write_at(&vec!["ada".to_string()], at(120));
        assert!(cache.read_at(Duration::from_secs(60), at(0)).is_some());
    }

    #[test]
    fn corrupt_entries_read_as_miss() {
        let storage = Arc::new(MemoryCacheStorage::default());
        storage.store("users", "{not json").expect("store");
        let cache = mirror(storage.clone());
        assert_eq!(cache.read(Duration::from_secs(60)), None);
        assert_eq!(storage.load("users").expect("load"), None);
    }

    #[test]
    fn file_storage_round_trips_under_its_directory() {
        let dir = std::env::temp_dir().join(format!("pm_cache_test_{}", uuid::Uuid::new_v4()));
        let storage = FileCacheStorage::new(&dir);
        storage.store("tasks/all", "[]").expect("store");
        assert!(dir.join("tasks_all.json").exists());
        assert_eq!(storage.load("tasks/all").expect("load").as_deref(), Some("[]"));
        storage.remove("tasks/all").expect("remove");
        storage.remove("tasks/all").expect("second remove is a no-op");
        assert_eq!(storage.load("tasks/all").expect("load"), None);
        let _ = fs::remove_dir_all(dir);
    }
}
