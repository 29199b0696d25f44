//! Cache error types.

use thiserror::Error;

/// Errors that can occur in the cache and durable storage layers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Storage is disabled or cannot be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Writing would exceed the storage quota.
    #[error("Storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    /// A persisted snapshot has a version this build cannot read.
    #[error("Schema mismatch: found version {found}, expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    /// Failed to (de)serialize a value.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Whether the failure means storage can't be used at all this session,
    /// as opposed to one bad payload.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            CacheError::Unavailable(_) | CacheError::QuotaExceeded { .. } | CacheError::Io(_)
        )
    }
}
