//! Debounced persistence of dirty partitions.
//!
//! Each partition owns at most one timer task. A mutation bumps the
//! partition's generation and spawns the timer if none is pending; the
//! timer sleeps for the debounce window and goes back to sleep as long as
//! the generation keeps moving. Once a full window passes without a
//! mutation the partition's current contents are written, so a burst of N
//! sets costs one write carrying the state after the last of them.
//!
//! Writes of a single partition are serialized by its `io` lock and the
//! snapshot is taken after that lock is acquired, so a later write always
//! carries a later state.

use std::sync::PoisonError;
use std::sync::atomic::Ordering;

use chrono::Utc;
use tracing::{debug, error, warn};

use super::disk_cache::{DiskCache, Partition};
use super::store;
use crate::Error;

impl DiskCache {
    /// Record a mutation and arm the partition's timer.
    pub(super) fn mark_dirty(&self, name: &str, part: &mut Partition) {
        part.dirty = true;
        part.generation = part.generation.wrapping_add(1);

        if part.timer.is_none() {
            let cache = self.clone();
            let name = name.to_string();
            let generation = part.generation;
            part.timer = Some(tokio::spawn(async move { cache.debounce(name, generation).await }));
        }
    }

    async fn debounce(self, name: String, mut seen: u64) {
        loop {
            tokio::time::sleep(self.shared.debounce).await;

            let mut parts = self.shared.partitions.lock().await;
            let Some(part) = parts.get_mut(&name) else {
                return;
            };
            if part.generation != seen {
                seen = part.generation;
                continue;
            }
            part.timer = None;
            if !part.dirty {
                return;
            }
            break;
        }

        if let Err(err) = self.persist(&name).await {
            self.report(&name, &err);
        }
    }

    /// Write `name` to disk if it is dirty.
    ///
    /// Returns whether a write happened. On failure the partition is left
    /// dirty and the error is kept for [`DiskCache::status`].
    pub(super) async fn persist(&self, name: &str) -> Result<bool, Error> {
        let shared = &self.shared;

        let io = match shared.partitions.lock().await.get(name) {
            Some(part) => part.io.clone(),
            None => return Ok(false),
        };
        let _io = io.lock().await;

        let encoded = {
            let mut parts = shared.partitions.lock().await;
            let Some(part) = parts.get_mut(name) else {
                return Ok(false);
            };
            if !part.dirty {
                return Ok(false);
            }
            let encoded = store::encode(name, &part.entries);
            if encoded.is_ok() {
                part.dirty = false;
            }
            encoded
        };

        let result = match encoded {
            Ok(body) => store::write_raw(&shared.dir, name, body).await,
            Err(err) => Err(err),
        };

        let mut parts = shared.partitions.lock().await;
        let part = parts.get_mut(name);
        match result {
            Ok(()) => {
                shared.stats.flushes.fetch_add(1, Ordering::Relaxed);
                if let Some(part) = part {
                    part.last_flushed_at = Some(Utc::now());
                    part.last_error = None;
                }
                debug!(namespace = %shared.namespace, partition = name, "partition flushed");
                Ok(true)
            }
            Err(err) => {
                shared.stats.flush_failures.fetch_add(1, Ordering::Relaxed);
                if let Some(part) = part {
                    part.dirty = true;
                    part.last_error = Some(err.to_string());
                }
                Err(err)
            }
        }
    }

    fn report(&self, name: &str, err: &Error) {
        error!(
            namespace = %self.shared.namespace,
            partition = name,
            error = %err,
            "background flush failed"
        );

        let handler = self
            .shared
            .on_flush_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(name, err);
        }
    }

    /// Write every dirty partition now and wait for the writes to finish.
    ///
    /// Also waits for background writes already in progress. Every partition
    /// is attempted; the first error is returned.
    ///
    /// Returns the number of partitions written by this call.
    pub async fn flush_all(&self) -> Result<usize, Error> {
        let mut names: Vec<String> = self.shared.partitions.lock().await.keys().cloned().collect();
        names.sort_unstable();

        let mut written = 0;
        let mut first_err = None;
        for name in names {
            match self.persist(&name).await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(namespace = %self.shared.namespace, partition = %name, error = %err, "flush failed");
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(written),
        }
    }

    /// Cancel pending timers and flush everything.
    ///
    /// Call before exiting so the last debounce window is not lost. The
    /// cache stays usable afterwards.
    pub async fn shutdown(&self) -> Result<usize, Error> {
        {
            let mut parts = self.shared.partitions.lock().await;
            for part in parts.values_mut() {
                if let Some(timer) = part.timer.take() {
                    timer.abort();
                }
            }
        }

        let written = self.flush_all().await?;
        debug!(namespace = %self.shared.namespace, written, "cache shut down");
        Ok(written)
    }
}
