//! Bounded-resource pool for parsed syntax trees.
//!
//! Two structures cooperate: an LRU cache keyed by `(path, content_hash)`
//! that returns a tree already built for unchanged content, and a FIFO
//! reuse pool of parser-allocated scratch trees that would otherwise be
//! dropped and reallocated on every parse. Both are bounded so a run over
//! a very large solution cannot grow memory without limit.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::config::TreePoolConfig;

/// Key identifying a cached parse result: the source file path plus the
/// content fingerprint of what was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeKey {
    pub path: String,
    pub content_hash: String,
}

#[derive(Debug, Default)]
pub struct TreePoolStatisticsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub pool_hits: u64,
    pub new_creations: u64,
}

struct Counters {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    pool_hits: AtomicU64,
    new_creations: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Counters {
            total_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            pool_hits: AtomicU64::new(0),
            new_creations: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> TreePoolStatisticsSnapshot {
        TreePoolStatisticsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            pool_hits: self.pool_hits.load(Ordering::Relaxed),
            new_creations: self.new_creations.load(Ordering::Relaxed),
        }
    }
}

/// Pools parsed syntax trees of type `T` (a parser's own tree type, opaque
/// to this module) across repeated parses of the same file content.
pub struct SyntaxTreePool<T> {
    config: TreePoolConfig,
    cache: Mutex<LruCache<TreeKey, Arc<T>>>,
    reuse_pool: Mutex<Vec<T>>,
    counters: Counters,
}

impl<T> SyntaxTreePool<T> {
    pub fn new(config: TreePoolConfig) -> Self {
        let cache_size = std::num::NonZeroUsize::new(config.max_cache_size.max(1)).unwrap();
        SyntaxTreePool {
            config,
            cache: Mutex::new(LruCache::new(cache_size)),
            reuse_pool: Mutex::new(Vec::new()),
            counters: Counters::new(),
        }
    }

    /// Returns a cached tree for `key` if one exists, without touching the
    /// reuse pool.
    pub fn get_cached(&self, key: &TreeKey) -> Option<Arc<T>> {
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);
        let mut cache = self.cache.lock();
        if let Some(tree) = cache.get(key) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(tree));
        }
        None
    }

    /// Inserts a freshly parsed tree into the content cache.
    pub fn insert(&self, key: TreeKey, tree: Arc<T>) {
        self.cache.lock().put(key, tree);
    }

    /// Takes a scratch tree out of the FIFO reuse pool for a parser to
    /// reinitialize in place, if one is available.
    pub fn take_for_reuse(&self) -> Option<T> {
        let mut pool = self.reuse_pool.lock();
        if let Some(tree) = pool.pop() {
            self.counters.pool_hits.fetch_add(1, Ordering::Relaxed);
            Some(tree)
        } else {
            self.counters.new_creations.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Returns a scratch tree to the reuse pool once a parser is done with
    /// it. Dropped silently once the pool is at capacity.
    pub fn return_for_reuse(&self, tree: T) {
        let mut pool = self.reuse_pool.lock();
        if pool.len() < self.config.max_pool_size {
            pool.push(tree);
        }
    }

    /// Drops cache entries and reuse-pool trees beyond configured bounds.
    /// The content cache self-bounds via LRU eviction on insert; this is
    /// for the reuse pool, which only grows via explicit returns.
    pub fn cleanup(&self) {
        let mut pool = self.reuse_pool.lock();
        if pool.len() > self.config.max_pool_size {
            pool.truncate(self.config.max_pool_size);
        }
    }

    pub fn statistics(&self) -> TreePoolStatisticsSnapshot {
        self.counters.snapshot()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn pool_len(&self) -> usize {
        self.reuse_pool.lock().len()
    }
}
