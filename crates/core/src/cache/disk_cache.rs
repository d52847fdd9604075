//! Partitioned key/value cache backed by one JSON file per partition.
//!
//! A partition is read from disk the first time it is touched and never
//! again; from then on the in-memory copy is authoritative. Mutations mark
//! the partition dirty and arm its debounce timer (see `flush`), so callers
//! never wait for the disk write.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::namespace::{Namespace, validate_name};
use super::store::{self, Entries};
use crate::Error;
use crate::config::{CacheConfig, CorruptPolicy};

/// Callback receiving failures of debounced background writes.
///
/// Arguments are the partition name and the error.
pub type FlushErrorHandler = Arc<dyn Fn(&str, &Error) + Send + Sync>;

pub(super) struct Partition {
    pub(super) entries: Entries,
    pub(super) dirty: bool,
    /// Bumped on every mutation; the debounce timer compares it to detect activity.
    pub(super) generation: u64,
    pub(super) timer: Option<JoinHandle<()>>,
    /// Serializes writes of this partition.
    pub(super) io: Arc<Mutex<()>>,
    pub(super) last_flushed_at: Option<DateTime<Utc>>,
    pub(super) last_error: Option<String>,
}

impl Partition {
    fn new(entries: Entries) -> Self {
        Self {
            entries,
            dirty: false,
            generation: 0,
            timer: None,
            io: Arc::new(Mutex::new(())),
            last_flushed_at: None,
            last_error: None,
        }
    }
}

#[derive(Default)]
pub(super) struct Counters {
    pub(super) loads: AtomicU64,
    pub(super) flushes: AtomicU64,
    pub(super) flush_failures: AtomicU64,
}

pub(super) struct Shared {
    pub(super) namespace: Namespace,
    pub(super) dir: PathBuf,
    pub(super) debounce: Duration,
    pub(super) on_corrupt: CorruptPolicy,
    pub(super) partitions: Mutex<HashMap<String, Partition>>,
    pub(super) on_flush_error: std::sync::Mutex<Option<FlushErrorHandler>>,
    pub(super) stats: Counters,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let mut unflushed: Vec<&str> = self
            .partitions
            .get_mut()
            .iter()
            .filter(|(_, part)| part.dirty)
            .map(|(name, _)| name.as_str())
            .collect();
        if !unflushed.is_empty() {
            unflushed.sort_unstable();
            warn!(
                namespace = %self.namespace,
                partitions = ?unflushed,
                "cache dropped with unflushed partitions"
            );
        }
    }
}

/// Disk-persisted cache for one namespace.
///
/// Cloning is cheap and every clone shares the same in-memory index, so a
/// single instance per namespace directory can be handed to all crawl
/// tasks. Two instances (or two processes) over the same directory are not
/// coordinated and will overwrite each other.
#[derive(Clone)]
pub struct DiskCache {
    pub(super) shared: Arc<Shared>,
}

impl fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskCache")
            .field("namespace", &self.shared.namespace)
            .field("dir", &self.shared.dir)
            .field("debounce", &self.shared.debounce)
            .finish_non_exhaustive()
    }
}

impl DiskCache {
    /// Open the cache for `namespace` under `config.root_dir`.
    ///
    /// Creates `<root_dir>/<namespace>` (and parents) if needed. Nothing is
    /// read until a partition is first accessed.
    pub async fn open(namespace: Namespace, config: &CacheConfig) -> Result<Self, Error> {
        let dir = config.root_dir.join(namespace.as_str());
        store::ensure_dir(&dir).await?;

        debug!(namespace = %namespace, dir = %dir.display(), debounce_ms = config.debounce_ms, "cache opened");

        Ok(Self {
            shared: Arc::new(Shared {
                namespace,
                dir,
                debounce: config.debounce(),
                on_corrupt: config.on_corrupt,
                partitions: Mutex::new(HashMap::new()),
                on_flush_error: std::sync::Mutex::new(None),
                stats: Counters::default(),
            }),
        })
    }

    /// Install the sink for background write failures.
    ///
    /// Failures are logged regardless; the handler is for callers that need
    /// to react (abort the crawl, raise an alert).
    pub fn set_flush_error_handler(&self, handler: FlushErrorHandler) {
        *self.shared.on_flush_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Builder-style variant of [`DiskCache::set_flush_error_handler`].
    pub fn with_flush_error_handler(self, handler: FlushErrorHandler) -> Self {
        self.set_flush_error_handler(handler);
        self
    }

    pub fn namespace(&self) -> &Namespace {
        &self.shared.namespace
    }

    /// Directory holding this namespace's partition files.
    pub fn dir(&self) -> &Path {
        &self.shared.dir
    }

    /// Look up `key` in `partition`.
    ///
    /// Returns `Ok(None)` when the key has never been set. Use
    /// `serde_json::Value` as `T` to read values without a schema.
    ///
    /// # Errors
    ///
    /// `PartitionLoad` if this is the first access and the file cannot be
    /// read or parsed, `Decode` if the stored value does not fit `T`.
    pub async fn get<T: DeserializeOwned>(&self, partition: &str, key: &str) -> Result<Option<T>, Error> {
        let mut parts = self.shared.partitions.lock().await;
        let part = self.loaded(&mut parts, partition).await?;

        part.entries
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| Error::Decode {
                    partition: partition.to_string(),
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Whether `key` is present in `partition`.
    pub async fn contains(&self, partition: &str, key: &str) -> Result<bool, Error> {
        let mut parts = self.shared.partitions.lock().await;
        let part = self.loaded(&mut parts, partition).await?;
        Ok(part.entries.contains_key(key))
    }

    /// Store `value` under `key` in `partition`, replacing any previous value.
    ///
    /// The change is visible to `get` immediately. The partition file is
    /// rewritten once the partition has been quiet for the debounce window.
    pub async fn set<T: Serialize + ?Sized>(&self, partition: &str, key: &str, value: &T) -> Result<(), Error> {
        let value = serde_json::to_value(value).map_err(|e| Error::Encode(e.to_string()))?;

        let mut parts = self.shared.partitions.lock().await;
        let part = self.loaded(&mut parts, partition).await?;
        part.entries.insert(key.to_string(), value);
        self.mark_dirty(partition, part);
        Ok(())
    }

    /// Remove `key` from `partition`, returning the previous value.
    ///
    /// Only an actual removal schedules a write.
    pub async fn remove(&self, partition: &str, key: &str) -> Result<Option<Value>, Error> {
        let mut parts = self.shared.partitions.lock().await;
        let part = self.loaded(&mut parts, partition).await?;
        let removed = part.entries.remove(key);
        if removed.is_some() {
            self.mark_dirty(partition, part);
        }
        Ok(removed)
    }

    /// Cache-aside lookup: return the cached value or compute and store it.
    ///
    /// The index lock is not held while `compute` runs. A failed computation
    /// stores nothing.
    pub async fn get_or_compute<T, E, F, Fut>(&self, partition: &str, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<Error>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(partition, key).await? {
            return Ok(hit);
        }

        let value = compute().await?;
        self.set(partition, key, &value).await?;
        Ok(value)
    }

    /// Return the loaded partition, reading it from disk on first access.
    ///
    /// Runs under the index lock, so concurrent first accesses read once.
    async fn loaded<'a>(
        &self, parts: &'a mut HashMap<String, Partition>, partition: &str,
    ) -> Result<&'a mut Partition, Error> {
        validate_name(partition)?;

        match parts.entry(partition.to_string()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let entries = self.read(partition).await?;
                Ok(slot.insert(Partition::new(entries)))
            }
        }
    }

    async fn read(&self, partition: &str) -> Result<Entries, Error> {
        let shared = &self.shared;
        shared.stats.loads.fetch_add(1, Ordering::Relaxed);

        let Some(raw) = store::read_raw(&shared.dir, partition).await? else {
            debug!(namespace = %shared.namespace, partition, "partition not on disk, starting empty");
            return Ok(Entries::new());
        };

        match store::decode(partition, &raw) {
            Ok(entries) => {
                debug!(namespace = %shared.namespace, partition, entries = entries.len(), "partition loaded");
                Ok(entries)
            }
            Err(err) if shared.on_corrupt == CorruptPolicy::Reset => {
                let backup = store::quarantine(&shared.dir, partition).await?;
                warn!(
                    namespace = %shared.namespace,
                    partition,
                    backup = %backup.display(),
                    error = %err,
                    "corrupt partition moved aside, starting empty"
                );
                Ok(Entries::new())
            }
            Err(err) => Err(err),
        }
    }
}
