//! Introspection of a running cache.

use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::disk_cache::DiskCache;

/// Lifetime counters of a cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Partition loads, including loads of partitions that had no file.
    pub loads: u64,
    /// Successful partition writes.
    pub flushes: u64,
    pub flush_failures: u64,
}

/// State of one loaded partition.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatus {
    pub name: String,
    pub entries: usize,
    /// Holds changes not yet on disk.
    pub dirty: bool,
    /// A debounce timer is armed.
    pub pending: bool,
    pub last_flushed_at: Option<DateTime<Utc>>,
    /// Error of the most recent failed write, cleared by the next success.
    pub last_error: Option<String>,
}

impl DiskCache {
    pub fn stats(&self) -> CacheStats {
        let stats = &self.shared.stats;
        CacheStats {
            loads: stats.loads.load(Ordering::Relaxed),
            flushes: stats.flushes.load(Ordering::Relaxed),
            flush_failures: stats.flush_failures.load(Ordering::Relaxed),
        }
    }

    /// Status of every loaded partition, sorted by name.
    pub async fn status(&self) -> Vec<PartitionStatus> {
        let parts = self.shared.partitions.lock().await;
        let mut status: Vec<PartitionStatus> = parts
            .iter()
            .map(|(name, part)| PartitionStatus {
                name: name.clone(),
                entries: part.entries.len(),
                dirty: part.dirty,
                pending: part.timer.is_some(),
                last_flushed_at: part.last_flushed_at,
                last_error: part.last_error.clone(),
            })
            .collect();
        status.sort_by(|a, b| a.name.cmp(&b.name));
        status
    }
}
