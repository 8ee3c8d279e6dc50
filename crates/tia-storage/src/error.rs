//! Storage-layer error types.
//!
//! Per the propagation policy for this system, none of these variants are
//! meant to escape [`crate::blob_store::CompressedBlobStore`] or
//! [`crate::call_graph_cache::CallGraphCache`] public operations -- I/O
//! failures are converted to a miss at the call site. `StorageError` exists
//! for the narrow internal paths (serialization during `set`, directory
//! creation at construction) where a caller-visible `Result` is the
//! right shape.

use thiserror::Error;

/// Errors produced by the storage layer's internal operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to create or access the cache root directory.
    #[error("cache root unavailable: {0}")]
    RootUnavailable(std::io::Error),

    /// JSON (de)serialization of a manifest or entry failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression or decompression of a stored payload failed.
    #[error("compression error: {0}")]
    Compression(std::io::Error),

    /// A write could not be made durable (atomic rename failed, disk full).
    #[error("write failed: {0}")]
    WriteFailed(std::io::Error),
}
