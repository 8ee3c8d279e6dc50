//! Persistent, multi-tier storage for compiled artifacts and call graphs:
//! a compressed blob store, a bounded syntax-tree pool, an L1/L2/L3
//! compilation cache, and a call-graph cache that validates entries
//! against source, compiler, and dependency fingerprints.

use std::path::{Path, PathBuf};

pub mod blob_io;
pub mod blob_store;
pub mod call_graph_cache;
pub mod compilation_tiers;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod tree_pool;
pub mod watcher;

pub use blob_store::{CompressedBlobStore, RawLookup};
pub use call_graph_cache::CallGraphCache;
pub use compilation_tiers::{
    CompilationCacheTiers, CompilationManifest, CompilationRequest, SharedCompilationTier,
};
pub use config::{CacheConfig, CompressionLevel, TierExpirations, TreePoolConfig};
pub use error::StorageError;
pub use maintenance::{spawn_background_maintenance, Maintainable, MaintenanceHandle};
pub use tree_pool::{SyntaxTreePool, TreeKey};
pub use watcher::{SourceChange, SourceWatcher};

pub(crate) fn namespace_path(cache_root: &Path, namespace: &str) -> PathBuf {
    cache_root.join(namespace)
}
