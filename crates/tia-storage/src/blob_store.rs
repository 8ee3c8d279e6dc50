//! A fingerprint-keyed, compressed, TTL-evicting blob store.
//!
//! Entries are sharded two hex characters deep under `cache_root` so that no
//! directory holds more than a few hundred files even at cache sizes with
//! tens of thousands of entries. An in-memory index mirrors each entry's
//! size and last-access time so `maintenance()` can make eviction decisions
//! without re-reading every blob header from disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tia_core::CacheStatistics;

use crate::config::CacheConfig;
use crate::error::StorageError;
use crate::{blob_io, namespace_path};

struct IndexEntry {
    compressed_size: u64,
    uncompressed_size: u64,
    last_accessed_millis: AtomicI64,
}

/// Outcome of a statistics-free blob lookup, for callers that reinterpret
/// a blob-level result (e.g. a domain-specific invalidation reason) rather
/// than accepting it as a plain hit or miss.
pub enum RawLookup<T> {
    Hit(T),
    Missing,
    Expired,
    Corrupt,
}

/// Compressed, TTL-bounded key/value blob storage rooted at a configurable
/// directory, shared by [`crate::call_graph_cache::CallGraphCache`] and the
/// L3 tier of [`crate::compilation_tiers::CompilationCacheTiers`].
pub struct CompressedBlobStore {
    namespace: &'static str,
    config: CacheConfig,
    stats: Arc<CacheStatistics>,
    index: DashMap<String, IndexEntry>,
}

impl CompressedBlobStore {
    /// Opens (or creates) a store rooted at `config.cache_root/namespace`,
    /// rebuilding its in-memory index by scanning whatever is already on
    /// disk. Scanning is best-effort: unreadable entries are skipped, not
    /// treated as a construction failure.
    pub fn open(namespace: &'static str, config: CacheConfig) -> Result<Self, StorageError> {
        let root = namespace_path(&config.cache_root, namespace);
        std::fs::create_dir_all(&root).map_err(StorageError::RootUnavailable)?;

        let store = CompressedBlobStore {
            namespace,
            config,
            stats: Arc::new(CacheStatistics::new()),
            index: DashMap::new(),
        };
        store.rebuild_index(&root);
        Ok(store)
    }

    pub fn statistics(&self) -> Arc<CacheStatistics> {
        Arc::clone(&self.stats)
    }

    fn rebuild_index(&self, root: &Path) {
        let Ok(shards) = std::fs::read_dir(root) else { return };
        for shard in shards.flatten() {
            let Ok(files) = std::fs::read_dir(shard.path()) else { continue };
            for file in files.flatten() {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("blob") {
                    continue;
                }
                let Some(key) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                if let Some(decoded) = blob_io::read_decoded(&path) {
                    self.index.insert(
                        key.to_string(),
                        IndexEntry {
                            compressed_size: decoded.compressed_size,
                            uncompressed_size: decoded.uncompressed_size,
                            last_accessed_millis: AtomicI64::new(Utc::now().timestamp_millis()),
                        },
                    );
                    self.stats.record_store(
                        decoded.compressed_size as i64,
                        decoded.uncompressed_size as i64,
                    );
                }
            }
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let root = namespace_path(&self.config.cache_root, self.namespace);
        let shard = if key.len() >= 2 { &key[0..2] } else { "00" };
        root.join(shard).join(format!("{key}.blob"))
    }

    /// Looks up `key` and deserializes its payload as `T`. Returns `None`
    /// on a cache miss, an expired entry, or a corrupt blob -- all three
    /// are indistinguishable misses from the caller's perspective, though
    /// corruption also removes the offending file and bumps the corruption
    /// counter.
    ///
    /// This is the plain storage-level lookup; it always records its own
    /// outcome into [`CacheStatistics`]. A domain layer that needs to
    /// reinterpret a blob-level hit as, say, an invalidation (a stale
    /// compiler version, a changed fingerprint) should use
    /// [`Self::get_raw`] instead and own its own counters.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get_raw(key) {
            RawLookup::Hit(value) => {
                self.stats.record_hit();
                Some(value)
            }
            RawLookup::Missing => {
                self.stats.record_miss();
                None
            }
            RawLookup::Expired => {
                self.stats.record_invalidation();
                self.remove(key);
                None
            }
            RawLookup::Corrupt => {
                self.stats.record_corruption();
                self.remove(key);
                None
            }
        }
    }

    /// Looks up `key` without touching [`CacheStatistics`] or removing a
    /// stale/corrupt blob -- the caller decides what the outcome means and
    /// is responsible for eviction and counter bookkeeping. A successful
    /// decode still refreshes the entry's last-accessed time, since that
    /// is an LRU-maintenance concern rather than a statistics one.
    pub fn get_raw<T: DeserializeOwned>(&self, key: &str) -> RawLookup<T> {
        let path = self.path_for(key);
        let decoded = match blob_io::read_decoded(&path) {
            Some(d) => d,
            None => {
                return if path.exists() {
                    RawLookup::Corrupt
                } else {
                    RawLookup::Missing
                };
            }
        };

        let age = Utc::now().signed_duration_since(decoded.created_at);
        if age.to_std().unwrap_or(Duration::MAX) > decoded.ttl {
            return RawLookup::Expired;
        }

        match serde_json::from_slice::<T>(&decoded.payload) {
            Ok(value) => {
                if let Some(entry) = self.index.get(key) {
                    entry
                        .last_accessed_millis
                        .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
                }
                RawLookup::Hit(value)
            }
            Err(_) => RawLookup::Corrupt,
        }
    }

    /// Serializes and stores `value` under `key` with `ttl` (or the
    /// configured default).
    pub fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let payload = serde_json::to_vec(value)?;
        let path = self.path_for(key);
        let ttl = ttl.unwrap_or(self.config.ttl_default);
        let now = Utc::now();

        let previous = self.index.get(key).map(|e| {
            (e.compressed_size as i64, e.uncompressed_size as i64)
        });

        let compressed_size =
            blob_io::write_atomic(&path, &payload, now, ttl, self.config.compression_level)?;

        if let Some((prev_compressed, prev_uncompressed)) = previous {
            self.stats
                .record_removal(prev_compressed, prev_uncompressed);
        }
        self.stats
            .record_store(compressed_size as i64, payload.len() as i64);
        self.index.insert(
            key.to_string(),
            IndexEntry {
                compressed_size,
                uncompressed_size: payload.len() as u64,
                last_accessed_millis: AtomicI64::new(now.timestamp_millis()),
            },
        );

        Ok(())
    }

    /// Removes `key` if present. Returns whether an entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        let path = self.path_for(key);
        let existed = std::fs::remove_file(&path).is_ok();
        if let Some((_, entry)) = self.index.remove(key) {
            self.stats.record_removal(
                -(entry.compressed_size as i64),
                -(entry.uncompressed_size as i64),
            );
        }
        existed
    }

    /// Removes every entry in this namespace.
    pub fn clear(&self) {
        let root = namespace_path(&self.config.cache_root, self.namespace);
        let _ = std::fs::remove_dir_all(&root);
        let _ = std::fs::create_dir_all(&root);
        self.index.clear();
    }

    /// Sweeps expired entries and, if the store is more than 10% over its
    /// configured size bound, evicts least-recently-accessed entries until
    /// back under bound. Returns the number of entries removed.
    pub fn maintenance(&self) -> usize {
        let mut removed = 0usize;
        let now = Utc::now();

        let expired: Vec<String> = self
            .index
            .iter()
            .filter_map(|entry| {
                let path = self.path_for(entry.key());
                let decoded = blob_io::read_decoded(&path)?;
                let age = now.signed_duration_since(decoded.created_at);
                if age.to_std().unwrap_or(Duration::MAX) > decoded.ttl {
                    Some(entry.key().clone())
                } else {
                    None
                }
            })
            .collect();
        for key in expired {
            if self.remove(&key) {
                self.stats.record_invalidation();
                removed += 1;
            }
        }

        let total: u64 = self
            .index
            .iter()
            .map(|e| e.compressed_size)
            .sum();
        let bound = self.config.max_total_size_bytes;
        let overflow_bound = bound + bound / 10;
        if total > overflow_bound {
            let mut entries: Vec<(String, u64, i64)> = self
                .index
                .iter()
                .map(|e| {
                    (
                        e.key().clone(),
                        e.compressed_size,
                        e.last_accessed_millis.load(Ordering::Relaxed),
                    )
                })
                .collect();
            entries.sort_by_key(|(_, _, accessed)| *accessed);

            let mut running = total;
            for (key, size, _) in entries {
                if running <= bound {
                    break;
                }
                if self.remove(&key) {
                    running = running.saturating_sub(size);
                    removed += 1;
                }
            }
        }

        self.stats.record_maintenance(now);
        removed
    }
}

impl crate::maintenance::Maintainable for CompressedBlobStore {
    fn run_maintenance(&self) -> usize {
        self.maintenance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Payload {
        value: String,
    }

    fn store(cfg: CacheConfig) -> CompressedBlobStore {
        CompressedBlobStore::open("test_ns", cfg).unwrap()
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CacheConfig::default().with_cache_root(dir.path());
        let s = store(cfg);

        s.set("abcd1234", &Payload { value: "hi".into() }, None).unwrap();
        let got: Option<Payload> = s.get("abcd1234");
        assert_eq!(got, Some(Payload { value: "hi".into() }));
    }

    #[test]
    fn missing_key_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CacheConfig::default().with_cache_root(dir.path());
        let s = store(cfg);
        let got: Option<Payload> = s.get("nope");
        assert_eq!(got, None);
    }

    #[test]
    fn expired_entry_is_evicted_on_get() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CacheConfig::default()
            .with_cache_root(dir.path())
            .with_ttl_default(Duration::from_millis(1));
        let s = store(cfg);
        s.set("key1", &Payload { value: "x".into() }, None).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let got: Option<Payload> = s.get("key1");
        assert_eq!(got, None);
    }

    #[test]
    fn remove_deletes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CacheConfig::default().with_cache_root(dir.path());
        let s = store(cfg);
        s.set("k", &Payload { value: "v".into() }, None).unwrap();
        assert!(s.remove("k"));
        let got: Option<Payload> = s.get("k");
        assert_eq!(got, None);
    }

    #[test]
    fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CacheConfig::default().with_cache_root(dir.path());
        let s = store(cfg);
        s.set("a", &Payload { value: "1".into() }, None).unwrap();
        s.set("b", &Payload { value: "2".into() }, None).unwrap();
        s.clear();
        assert_eq!(s.get::<Payload>("a"), None);
        assert_eq!(s.get::<Payload>("b"), None);
    }

    #[test]
    fn maintenance_evicts_lru_past_overflow_bound() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CacheConfig::default()
            .with_cache_root(dir.path())
            .with_max_total_size_bytes(1);
        let s = store(cfg);
        for i in 0..5 {
            s.set(&format!("key{i}"), &Payload { value: "x".repeat(200) }, None).unwrap();
        }
        let removed = s.maintenance();
        assert!(removed > 0);
    }

    #[test]
    fn reopening_rebuilds_index_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CacheConfig::default().with_cache_root(dir.path());
        {
            let s = store(cfg.clone());
            s.set("persisted", &Payload { value: "z".into() }, None).unwrap();
        }
        let reopened = store(cfg);
        let got: Option<Payload> = reopened.get("persisted");
        assert_eq!(got, Some(Payload { value: "z".into() }));
    }
}
