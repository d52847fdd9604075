//! Core types and shared functionality for chaincache.
//!
//! This crate provides:
//! - Partitioned disk cache with debounced persistence
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStats, DiskCache, Namespace, PartitionStatus};
pub use config::{CacheConfig, CorruptPolicy};
pub use error::Error;
