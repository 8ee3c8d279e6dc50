//! Process-wide cache statistics: atomic counters with a copy-out snapshot.
//!
//! Each field increments independently; a reader sees a consistent value
//! per field but not necessarily a consistent cross-field view, per the
//! ordering guarantees for this system. `snapshot` exists so that callers
//! never hold a reference into live atomics across a component boundary.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Atomic counters backing a single cache component's statistics.
#[derive(Debug, Default)]
pub struct CacheStatistics {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    corruption: AtomicU64,
    stores: AtomicU64,
    total_entries: AtomicI64,
    total_compressed_size: AtomicI64,
    total_uncompressed_size: AtomicI64,
    last_maintenance: Mutex<Option<DateTime<Utc>>>,
}

/// A copy-out, point-in-time view of [`CacheStatistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatisticsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub corruption: u64,
    pub stores: u64,
    pub total_entries: i64,
    pub total_compressed_size: i64,
    pub total_uncompressed_size: i64,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_corruption(&self) {
        self.corruption.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful store, updating entry count and size totals.
    pub fn record_store(&self, compressed_delta: i64, uncompressed_delta: i64) {
        self.stores.fetch_add(1, Ordering::Relaxed);
        self.total_entries.fetch_add(1, Ordering::Relaxed);
        self.total_compressed_size
            .fetch_add(compressed_delta, Ordering::Relaxed);
        self.total_uncompressed_size
            .fetch_add(uncompressed_delta, Ordering::Relaxed);
    }

    /// Records removal of an entry, reversing its contribution to the totals.
    pub fn record_removal(&self, compressed_delta: i64, uncompressed_delta: i64) {
        self.total_entries.fetch_sub(1, Ordering::Relaxed);
        self.total_compressed_size
            .fetch_sub(compressed_delta, Ordering::Relaxed);
        self.total_uncompressed_size
            .fetch_sub(uncompressed_delta, Ordering::Relaxed);
    }

    pub fn record_maintenance(&self, at: DateTime<Utc>) {
        *self.last_maintenance.lock() = Some(at);
    }

    pub fn last_maintenance(&self) -> Option<DateTime<Utc>> {
        *self.last_maintenance.lock()
    }

    /// Copies out a consistent-enough snapshot for logging/export.
    pub fn snapshot(&self) -> CacheStatisticsSnapshot {
        CacheStatisticsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            corruption: self.corruption.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            total_entries: self.total_entries.load(Ordering::Relaxed),
            total_compressed_size: self.total_compressed_size.load(Ordering::Relaxed),
            total_uncompressed_size: self.total_uncompressed_size.load(Ordering::Relaxed),
        }
    }
}
