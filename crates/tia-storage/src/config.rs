//! Configuration knobs for the blob store, compilation tiers, and
//! syntax-tree pool, gathered per the enumerated options in the design.

use std::path::PathBuf;
use std::time::Duration;

/// Compression effort level for [`crate::blob_store::CompressedBlobStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    Fast,
    Default,
    Best,
}

impl CompressionLevel {
    pub(crate) fn to_flate2(self) -> flate2::Compression {
        match self {
            CompressionLevel::Fast => flate2::Compression::fast(),
            CompressionLevel::Default => flate2::Compression::default(),
            CompressionLevel::Best => flate2::Compression::best(),
        }
    }
}

/// Configuration for [`crate::blob_store::CompressedBlobStore`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory for all persisted cache state.
    pub cache_root: PathBuf,
    /// Soft cap on total compressed bytes on disk; `maintenance()` evicts
    /// least-recently-accessed entries once 10% over this bound.
    pub max_total_size_bytes: u64,
    pub compression_level: CompressionLevel,
    /// Default time-to-live for a newly stored entry.
    pub ttl_default: Duration,
    pub background_maintenance: bool,
    pub maintenance_interval: Duration,
    /// Soft cap on in-memory tree/compilation state; advisory only.
    pub max_memory_usage_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            cache_root: PathBuf::from("./.tia-cache"),
            max_total_size_bytes: 100 * 1024 * 1024,
            compression_level: CompressionLevel::Best,
            ttl_default: Duration::from_secs(30 * 24 * 60 * 60),
            background_maintenance: false,
            maintenance_interval: Duration::from_secs(5 * 60),
            max_memory_usage_bytes: 512 * 1024 * 1024,
        }
    }
}

impl CacheConfig {
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    pub fn with_max_total_size_bytes(mut self, bytes: u64) -> Self {
        self.max_total_size_bytes = bytes;
        self
    }

    pub fn with_ttl_default(mut self, ttl: Duration) -> Self {
        self.ttl_default = ttl;
        self
    }

    pub fn with_background_maintenance(mut self, enabled: bool) -> Self {
        self.background_maintenance = enabled;
        self
    }
}

/// Configuration for [`crate::tree_pool::SyntaxTreePool`].
#[derive(Debug, Clone)]
pub struct TreePoolConfig {
    pub max_cache_size: usize,
    pub max_pool_size: usize,
    pub cleanup_interval: Duration,
}

impl Default for TreePoolConfig {
    fn default() -> Self {
        TreePoolConfig {
            max_cache_size: 1000,
            max_pool_size: 200,
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Per-tier expirations for [`crate::compilation_tiers::CompilationCacheTiers`].
#[derive(Debug, Clone)]
pub struct TierExpirations {
    pub l1: Duration,
    pub l2: Duration,
    pub l3: Duration,
    pub semantic_model: Duration,
    pub cleanup: Duration,
}

impl Default for TierExpirations {
    fn default() -> Self {
        TierExpirations {
            l1: Duration::from_secs(30 * 60),
            l2: Duration::from_secs(4 * 60 * 60),
            l3: Duration::from_secs(24 * 60 * 60),
            semantic_model: Duration::from_secs(15 * 60),
            cleanup: Duration::from_secs(10 * 60),
        }
    }
}
