//! Unified error types for chaincache.
//!
//! Display strings carry a stable code prefix so callers and logs can match
//! on the failure class without parsing the detail.

use std::path::PathBuf;

/// Unified error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The namespace directory could not be created.
    #[error("CACHE_DIR_INIT: {}: {reason}", .path.display())]
    DirectoryInit { path: PathBuf, reason: String },

    /// An existing partition file could not be read or parsed.
    #[error("PARTITION_LOAD: {partition}: {reason}")]
    PartitionLoad { partition: String, reason: String },

    /// A partition could not be serialized or written back to disk.
    #[error("PARTITION_WRITE: {partition}: {reason}")]
    PartitionWrite { partition: String, reason: String },

    /// Namespace or partition name that cannot be used as a path component.
    #[error("INVALID_NAME: {0}")]
    InvalidName(String),

    /// Filesystem failure outside a single partition (listing, removal).
    #[error("CACHE_IO: {0}")]
    Io(String),

    /// A value passed to `set` could not be converted to JSON.
    #[error("ENCODE_FAILED: {0}")]
    Encode(String),

    /// A cached value does not match the type requested by the caller.
    #[error("DECODE_FAILED: {partition}/{key}: {reason}")]
    Decode { partition: String, key: String, reason: String },
}

impl Error {
    pub(crate) fn load(partition: &str, reason: impl ToString) -> Self {
        Error::PartitionLoad { partition: partition.to_string(), reason: reason.to_string() }
    }

    pub(crate) fn write(partition: &str, reason: impl ToString) -> Self {
        Error::PartitionWrite { partition: partition.to_string(), reason: reason.to_string() }
    }

    /// Stable code for the error class, matching the display prefix.
    pub fn code(&self) -> &'static str {
        match self {
            Error::DirectoryInit { .. } => "CACHE_DIR_INIT",
            Error::PartitionLoad { .. } => "PARTITION_LOAD",
            Error::PartitionWrite { .. } => "PARTITION_WRITE",
            Error::InvalidName(_) => "INVALID_NAME",
            Error::Io(_) => "CACHE_IO",
            Error::Encode(_) => "ENCODE_FAILED",
            Error::Decode { .. } => "DECODE_FAILED",
        }
    }
}
