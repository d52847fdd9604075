//! File-backed, debounced key/value cache.
//!
//! This module provides a per-namespace cache persisted as one JSON file per
//! partition under `<root>/<namespace>/`. It supports:
//!
//! - Lazy, load-once partitions
//! - Immediate in-memory reads of writes
//! - Per-partition debounced, atomic file writes
//! - Explicit flush and shutdown for durability

mod disk_cache;
mod flush;
pub mod namespace;
mod status;
pub mod store;

pub use crate::Error;

pub use disk_cache::{DiskCache, FlushErrorHandler};
pub use namespace::Namespace;
pub use status::{CacheStats, PartitionStatus};
pub use store::Entries;
