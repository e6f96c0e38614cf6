//! The expiring key/value store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{FIELD_SEPARATOR, FLUSH_INTERVAL_SECS};

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Key is missing or expired.
    #[error("key not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The backing file could not be read or created.
    #[error("cache persistence I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// One cache entry. The write timestamp drives expiration.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    created_at: i64,
}

struct Inner {
    map: RwLock<HashMap<String, Entry>>,
    /// Expiration window in seconds. `<= 0` means keys never expire.
    ttl_seconds: i64,
    /// Backing file, if persistence is enabled.
    persist_path: Option<PathBuf>,
    /// Stops the periodic flush task.
    shutdown: CancellationToken,
}

/// Expiring key/value store, optionally mirrored to a flat file.
///
/// Cloning is cheap and every clone shares the same map. The map is guarded
/// by a read/write lock because the periodic flush task reads it
/// concurrently with `put`/`get` callers.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Creates a store that keeps its entries in memory only.
    pub fn in_memory(ttl_seconds: i64) -> Self {
        Self {
            inner: Arc::new(Inner {
                map: RwLock::new(HashMap::new()),
                ttl_seconds,
                persist_path: None,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Creates a store mirrored to `path`.
    ///
    /// The file is read once to rehydrate the map (expired and malformed
    /// lines are dropped), rewritten immediately so stale data is purged,
    /// and then rewritten in full every [`FLUSH_INTERVAL_SECS`] seconds.
    ///
    /// Must be called from within a tokio runtime; the flush task is spawned
    /// here and runs until [`Store::close`] is called.
    pub fn file_persisted(path: impl AsRef<Path>, ttl_seconds: i64) -> CacheResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = Self {
            inner: Arc::new(Inner {
                map: RwLock::new(HashMap::new()),
                ttl_seconds,
                persist_path: Some(path.clone()),
                shutdown: CancellationToken::new(),
            }),
        };

        store.rehydrate(&path)?;
        store.flush();

        let inner = Arc::clone(&store.inner);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(FLUSH_INTERVAL_SECS));
            // The first tick fires immediately and we already flushed above.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = inner.shutdown.cancelled() => break,
                    _ = interval.tick() => flush_map(&inner),
                }
            }
        });

        Ok(store)
    }

    /// Returns the value at `key`, or [`CacheError::NotFound`] if the key is
    /// missing or expired.
    pub fn get(&self, key: &str) -> CacheResult<String> {
        let map = self.inner.map.read();
        match map.get(key) {
            Some(entry) if !self.expired(entry.created_at) => Ok(entry.value.clone()),
            _ => Err(CacheError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    /// Returns the value at `key`, or `default` if the key is absent.
    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|_| default.to_string())
    }

    /// Stores `value` at `key`. An existing entry has its timestamp
    /// refreshed.
    pub fn put(&self, key: &str, value: &str) {
        self.insert_at(key, value, now_epoch());
    }

    /// True if `key` is missing or its entry has expired.
    pub fn absent(&self, key: &str) -> bool {
        let map = self.inner.map.read();
        match map.get(key) {
            Some(entry) => self.expired(entry.created_at),
            None => true,
        }
    }

    /// Appends `value` to the entry at `key`, joined by `separator`. Creates
    /// the entry if the key is absent.
    pub fn append(&self, key: &str, separator: &str, value: &str) {
        let joined = match self.get(key) {
            Ok(existing) => format!("{existing}{separator}{value}"),
            Err(_) => value.to_string(),
        };
        self.put(key, &joined);
    }

    /// Removes the entry at `key`, if any.
    pub fn clear(&self, key: &str) {
        self.inner.map.write().remove(key);
    }

    /// Stops the periodic flush task and performs a final flush.
    pub fn close(&self) {
        self.inner.shutdown.cancel();
        self.flush();
    }

    /// Writes the whole map to the backing file, replacing its contents.
    /// No-op for in-memory stores.
    pub fn flush(&self) {
        flush_map(&self.inner);
    }

    fn insert_at(&self, key: &str, value: &str, created_at: i64) {
        self.inner.map.write().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                created_at,
            },
        );
    }

    fn expired(&self, created_at: i64) -> bool {
        expired(self.inner.ttl_seconds, created_at)
    }

    /// Loads entries from the backing file. Malformed and expired lines are
    /// dropped with a log, never an error.
    fn rehydrate(&self, path: &Path) -> CacheResult<()> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            // First run: the file does not exist yet. The flush task
            // creates it.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        let mut map = self.inner.map.write();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            match parse_line(line) {
                Some((key, entry)) => {
                    if expired(self.inner.ttl_seconds, entry.created_at) {
                        debug!(key = %key, "dropping expired cache line");
                        continue;
                    }
                    map.insert(key, entry);
                }
                None => warn!(line = %line, "dropping malformed cache line"),
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("entries", &self.inner.map.read().len())
            .field("ttl_seconds", &self.inner.ttl_seconds)
            .field("persistent", &self.inner.persist_path.is_some())
            .finish()
    }
}

fn expired(ttl_seconds: i64, created_at: i64) -> bool {
    if ttl_seconds <= 0 {
        return false;
    }
    now_epoch() - created_at >= ttl_seconds
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Parses one persisted `key|value|timestamp` line.
fn parse_line(line: &str) -> Option<(String, Entry)> {
    let mut fields = line.split(FIELD_SEPARATOR);
    let key = fields.next()?;
    let value = fields.next()?;
    let created_at: i64 = fields.next()?.trim().parse().ok()?;
    if fields.next().is_some() || key.is_empty() {
        return None;
    }
    Some((
        key.to_string(),
        Entry {
            value: value.to_string(),
            created_at,
        },
    ))
}

fn format_line(key: &str, entry: &Entry) -> String {
    format!(
        "{key}{sep}{value}{sep}{ts}\n",
        sep = FIELD_SEPARATOR,
        value = entry.value,
        ts = entry.created_at,
    )
}

/// Serializes the map under a read lock and truncate-rewrites the file.
/// A crash between truncate and rewrite loses the cache, which is accepted
/// for this data (dedup ledgers, not financial records).
fn flush_map(inner: &Inner) {
    let Some(path) = inner.persist_path.as_ref() else {
        return;
    };

    let contents: String = {
        let map = inner.map.read();
        map.iter()
            .map(|(key, entry)| format_line(key, entry))
            .collect()
    };

    if let Err(err) = std::fs::write(path, contents) {
        error!(path = %path.display(), error = %err, "cache flush failed");
    }
}
