//! Persistent key/value cache with per-entry TTL.
//!
//! A small JSON file used to remember the last chosen quality and target
//! URL across reconnects (the session-reload hint). Safe for concurrent
//! `set`/`get` from multiple request workers; the lock is only held for
//! the in-memory map and the rewrite of the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::CacheError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// File-backed TTL key/value store.
pub struct StreamCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl StreamCache {
    /// Open the cache at `path`, loading existing entries. A missing or
    /// corrupt file starts the cache empty rather than failing.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match Self::load(&path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("starting with empty cache, could not load {}: {e}", path.display());
                HashMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn load(path: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut entries: HashMap<String, CacheEntry> = serde_json::from_str(&raw)?;
        Self::sweep(&mut entries);
        Ok(entries)
    }

    /// Drop every expired entry. Run on load and on every write so the
    /// file does not grow without bound across distinct keys.
    fn sweep(entries: &mut HashMap<String, CacheEntry>) {
        let now = Utc::now();
        entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Store `value` under `key`, expiring after `ttl`.
    pub fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(0));
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        Self::sweep(&mut entries);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        self.persist(&entries)
    }

    /// Fetch the value under `key`, dropping it when expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn persist(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StreamCache::open(dir.path().join("streamdata.json"));

        cache
            .set("cache:http://x/a:stream-name", "720p", Duration::from_secs(120))
            .unwrap();
        assert_eq!(
            cache.get("cache:http://x/a:stream-name"),
            Some("720p".to_string())
        );
        assert_eq!(cache.get("cache:http://x/a:url"), None);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StreamCache::open(dir.path().join("streamdata.json"));

        cache.set("gone", "x", Duration::from_secs(0)).unwrap();
        assert_eq!(cache.get("gone"), None);
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamdata.json");

        {
            let cache = StreamCache::open(&path);
            cache.set("kept", "value", Duration::from_secs(300)).unwrap();
        }

        let cache = StreamCache::open(&path);
        assert_eq!(cache.get("kept"), Some("value".to_string()));
    }

    #[test]
    fn test_expired_entries_are_swept_from_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamdata.json");
        let cache = StreamCache::open(&path);

        cache.set("stale", "x", Duration::from_secs(0)).unwrap();
        // A later write for a different key must not leave the stale
        // entry behind on disk.
        cache.set("fresh", "y", Duration::from_secs(300)).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("stale"));
        assert!(raw.contains("fresh"));

        let reopened = StreamCache::open(&path);
        assert_eq!(reopened.get("fresh"), Some("y".to_string()));
        assert_eq!(reopened.get("stale"), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamdata.json");
        std::fs::write(&path, "not json").unwrap();

        let cache = StreamCache::open(&path);
        assert_eq!(cache.get("anything"), None);
    }
}
