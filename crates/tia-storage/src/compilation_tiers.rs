//! Three-tier compilation cache keyed by a fingerprint string: an
//! in-process L1, an optional shared L2 (e.g. a network cache shared by a
//! build farm), and an on-disk L3. Every tier stores a
//! [`CompilationManifest`] -- a reconstruction recipe, never the compiled
//! artifact itself -- and every access revalidates the manifest against
//! current file stats rather than trusting TTL age alone, so a source file
//! touched inside the TTL window still invalidates the entry. A lower-tier
//! hit reconstructs the artifact through the caller's factory and promotes
//! the manifest back up through the tiers above it.
//!
//! A separate, L1-only cache handles semantic models, keyed by file path
//! and validated the same way (TTL and mtime, never TTL alone).
//!
//! Lookups and fills for the same key are serialized by a per-key mutex so
//! concurrent callers miss together and compute once rather than racing
//! duplicate work into all three tiers.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tia_core::CacheStatistics;
use tracing::debug;

use crate::blob_io;
use crate::config::{CacheConfig, CompressionLevel, TierExpirations};

/// Fallback reference set used when every path in a manifest's
/// `reference_paths` has gone missing from disk.
const DEFAULT_REFERENCE_PATHS: &[&str] = &[
    "mscorlib.dll",
    "System.dll",
    "System.Core.dll",
    "System.Private.CoreLib.dll",
];

/// Caller-supplied description of a compilation to cache: enough to key
/// the cache and, on a miss, build the [`CompilationManifest`] that will
/// validate future lookups.
#[derive(Debug, Clone)]
pub struct CompilationRequest {
    pub key: String,
    pub assembly_name: String,
    pub language: String,
    pub source_files: Vec<PathBuf>,
    pub reference_paths: Vec<PathBuf>,
}

/// A reconstruction recipe for a compilation, not the compiled artifact:
/// enough to decide whether a cached entry is still valid and, on a miss,
/// what to recompile from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationManifest {
    pub key: String,
    /// Recorded last-write time of the primary source file
    /// (`source_files[0]`), the cheap L1 freshness check.
    pub last_write_time: DateTime<Utc>,
    pub assembly_name: String,
    pub language: String,
    pub source_files: Vec<PathBuf>,
    pub source_file_times: HashMap<String, DateTime<Utc>>,
    pub reference_paths: Vec<PathBuf>,
}

impl CompilationManifest {
    fn from_request(request: &CompilationRequest) -> Self {
        let mut source_file_times = HashMap::new();
        for path in &request.source_files {
            source_file_times.insert(path_key(path), mtime(path));
        }
        let last_write_time = request
            .source_files
            .first()
            .map(|p| *source_file_times.get(&path_key(p)).unwrap())
            .unwrap_or_else(Utc::now);

        CompilationManifest {
            key: request.key.clone(),
            last_write_time,
            assembly_name: request.assembly_name.clone(),
            language: request.language.clone(),
            source_files: request.source_files.clone(),
            source_file_times,
            reference_paths: request.reference_paths.clone(),
        }
    }

    /// Cheap L1 check: only the primary source file's mtime against
    /// `last_write_time`, not the full recorded source set.
    fn is_fresh_cheap(&self) -> bool {
        match self.source_files.first() {
            Some(primary) => primary.exists() && mtime(primary) <= self.last_write_time,
            None => true,
        }
    }

    /// Full reconstruction validity (spec §4.4): every recorded source
    /// file must still exist with a current mtime no newer than recorded,
    /// and the primary file likewise.
    fn is_valid(&self) -> bool {
        if !self.is_fresh_cheap() {
            return false;
        }
        for (key, recorded) in &self.source_file_times {
            let path = Path::new(key);
            if !path.exists() || mtime(path) > *recorded {
                return false;
            }
        }
        true
    }

    /// Resolves this manifest's reference paths against disk, skipping any
    /// that no longer exist. Falls back to [`DEFAULT_REFERENCE_PATHS`] if
    /// every recorded reference is missing.
    pub fn live_reference_paths(&self) -> Vec<PathBuf> {
        let live: Vec<PathBuf> = self
            .reference_paths
            .iter()
            .filter(|p| p.exists())
            .cloned()
            .collect();
        if live.is_empty() && !self.reference_paths.is_empty() {
            return DEFAULT_REFERENCE_PATHS.iter().map(PathBuf::from).collect();
        }
        live
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn mtime(path: &Path) -> DateTime<Utc> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// A backend an L2 tier can be implemented against -- typically a network
/// or cross-process shared cache. Operates on manifests only: this cache
/// never persists the compiled artifact itself, only the recipe to rebuild
/// it. `remove` defaults to a no-op for backends with no cheap way to
/// evict a single key (e.g. a write-through cache relying on its own TTL).
pub trait SharedCompilationTier: Send + Sync {
    fn get(&self, key: &str) -> Option<CompilationManifest>;
    fn set(&self, key: &str, manifest: &CompilationManifest, ttl: Duration);
    fn remove(&self, _key: &str) {}
}

struct L1Entry<T> {
    value: Arc<T>,
    manifest: CompilationManifest,
}

struct SemanticModelEntry<M> {
    value: Arc<M>,
    file_path: PathBuf,
    recorded_mtime: DateTime<Utc>,
    created_at: DateTime<Utc>,
    ttl: Duration,
}

impl<M> SemanticModelEntry<M> {
    fn is_fresh(&self) -> bool {
        let age_ok = Utc::now()
            .signed_duration_since(self.created_at)
            .to_std()
            .unwrap_or(Duration::MAX)
            <= self.ttl;
        age_ok && self.file_path.exists() && mtime(&self.file_path) <= self.recorded_mtime
    }
}

/// Three-tier cache of compilation artifacts (`T`), plus a single-tier,
/// TTL-and-mtime-validated cache of semantic models (`M`).
pub struct CompilationCacheTiers<T, M> {
    cache_root: PathBuf,
    expirations: TierExpirations,
    l1: DashMap<String, L1Entry<T>>,
    l2: Option<Arc<dyn SharedCompilationTier>>,
    semantic_models: DashMap<String, SemanticModelEntry<M>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    stats: Arc<CacheStatistics>,
}

impl<T, M> CompilationCacheTiers<T, M>
where
    T: Send + Sync + 'static,
    M: Send + Sync + 'static,
{
    pub fn new(config: &CacheConfig, expirations: TierExpirations) -> Self {
        CompilationCacheTiers {
            cache_root: config.cache_root.clone(),
            expirations,
            l1: DashMap::new(),
            l2: None,
            semantic_models: DashMap::new(),
            locks: DashMap::new(),
            stats: Arc::new(CacheStatistics::new()),
        }
    }

    pub fn with_shared_tier(mut self, tier: Arc<dyn SharedCompilationTier>) -> Self {
        self.l2 = Some(tier);
        self
    }

    pub fn statistics(&self) -> Arc<CacheStatistics> {
        Arc::clone(&self.stats)
    }

    fn manifest_path(&self, key: &str) -> PathBuf {
        self.cache_root.join("compilation").join(key).join("manifest.blob")
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            &self.locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn read_l3(&self, key: &str) -> Option<CompilationManifest> {
        let decoded = blob_io::read_decoded(&self.manifest_path(key))?;
        serde_json::from_slice(&decoded.payload).ok()
    }

    fn write_l3(&self, key: &str, manifest: &CompilationManifest, ttl: Duration) {
        if let Ok(payload) = serde_json::to_vec(manifest) {
            let _ = blob_io::write_atomic(
                &self.manifest_path(key),
                &payload,
                Utc::now(),
                ttl,
                CompressionLevel::Default,
            );
        }
    }

    fn l1_fresh(&self, key: &str) -> Option<Arc<T>> {
        let entry = self.l1.get(key)?;
        entry.manifest.is_fresh_cheap().then(|| Arc::clone(&entry.value))
    }

    fn promote_to_l1(&self, key: &str, value: Arc<T>, manifest: CompilationManifest) {
        self.l1.insert(key.to_string(), L1Entry { value, manifest });
    }

    /// Returns the cached compilation artifact for `request`, following the
    /// tiered lookup contract (spec §4.4): L1 cheap check (primary source
    /// mtime only), then L2 full validity, then L3 full validity, promoting
    /// a lower-tier hit back up through the tiers above it. `factory`
    /// rebuilds `T` from `request` and runs exactly once per call, on
    /// whichever tier (or none) turns out to hold a valid manifest --
    /// this cache never persists `T` itself below L1, so a manifest hit at
    /// L2/L3 still requires reconstructing the artifact.
    pub fn get_or_create_compilation(
        &self,
        request: &CompilationRequest,
        factory: impl FnOnce(&CompilationRequest) -> T,
    ) -> Arc<T> {
        let key = request.key.clone();

        if let Some(hit) = self.l1_fresh(&key) {
            self.stats.record_hit();
            return hit;
        }
        self.l1.remove(&key);

        let lock = self.key_lock(&key);
        let _guard = lock.lock();
        if let Some(hit) = self.l1_fresh(&key) {
            self.stats.record_hit();
            return hit;
        }

        if let Some(l2) = &self.l2 {
            if let Some(manifest) = l2.get(&key) {
                if manifest.is_valid() {
                    self.stats.record_hit();
                    let value = Arc::new(factory(request));
                    self.promote_to_l1(&key, Arc::clone(&value), manifest);
                    return value;
                }
                debug!(key = %key, "L2 compilation manifest stale");
                self.stats.record_invalidation();
                l2.remove(&key);
            }
        }

        if let Some(manifest) = self.read_l3(&key) {
            if manifest.is_valid() {
                self.stats.record_hit();
                let value = Arc::new(factory(request));
                self.promote_to_l1(&key, Arc::clone(&value), manifest.clone());
                if let Some(l2) = &self.l2 {
                    l2.set(&key, &manifest, self.expirations.l2);
                }
                return value;
            }
            debug!(key = %key, "L3 compilation manifest stale");
            self.stats.record_invalidation();
            let _ = fs::remove_file(self.manifest_path(&key));
        }

        self.stats.record_miss();
        let manifest = CompilationManifest::from_request(request);
        let value = Arc::new(factory(request));
        self.promote_to_l1(&key, Arc::clone(&value), manifest.clone());
        if let Some(l2) = &self.l2 {
            l2.set(&key, &manifest, self.expirations.l2);
        }
        self.write_l3(&key, &manifest, self.expirations.l3);
        self.stats.record_store(0, 0);
        value
    }

    fn fresh_semantic_model(&self, key: &str) -> Option<Arc<M>> {
        // The `Ref` from `.get()` must be dropped before any `.remove()` on
        // the same map -- a match over the `.get()` call directly would
        // keep it alive (and the shard locked) for the whole match, which
        // deadlocks against `remove`'s write lock on the stale branch.
        let state = self
            .semantic_models
            .get(key)
            .map(|entry| entry.is_fresh().then(|| Arc::clone(&entry.value)));

        match state {
            Some(Some(value)) => {
                self.stats.record_hit();
                Some(value)
            }
            Some(None) => {
                self.semantic_models.remove(key);
                self.stats.record_invalidation();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Returns the cached semantic model for `file_path`, computing it via
    /// `compute` if absent, TTL-expired, or if the file's mtime has moved
    /// past what was recorded. L1-only per spec §4.4: semantic models are
    /// never persisted to L2/L3.
    pub fn get_or_create_semantic_model(
        &self,
        file_path: &Path,
        compute: impl FnOnce(&Path) -> M,
    ) -> Arc<M> {
        let key = path_key(file_path);
        if let Some(hit) = self.fresh_semantic_model(&key) {
            return hit;
        }

        let lock = self.key_lock(&key);
        let _guard = lock.lock();
        if let Some(hit) = self.fresh_semantic_model(&key) {
            return hit;
        }

        let value = Arc::new(compute(file_path));
        self.semantic_models.insert(
            key,
            SemanticModelEntry {
                value: Arc::clone(&value),
                file_path: file_path.to_path_buf(),
                recorded_mtime: mtime(file_path),
                created_at: Utc::now(),
                ttl: self.expirations.semantic_model,
            },
        );
        value
    }

    /// Evicts `key` from L1 and L3 (and L2, if configured). Bumps
    /// `invalidations` once if any tier actually held an entry for it.
    pub fn invalidate(&self, key: &str) {
        let had_l1 = self.l1.remove(key).is_some();
        let manifest_path = self.manifest_path(key);
        let had_l3 = manifest_path.exists() && fs::remove_file(&manifest_path).is_ok();
        if let Some(l2) = &self.l2 {
            l2.remove(key);
        }
        if had_l1 || had_l3 {
            self.stats.record_invalidation();
        }
    }

    /// Drops L1 entries whose manifest is no longer cheaply fresh and
    /// semantic-model entries past their TTL or mtime. L3 entries expire
    /// lazily on read, so nothing here sweeps disk eagerly.
    pub fn maintenance(&self) -> usize {
        let l1_before = self.l1.len();
        self.l1.retain(|_, entry| entry.manifest.is_fresh_cheap());
        let removed_l1 = l1_before - self.l1.len();

        let sm_before = self.semantic_models.len();
        self.semantic_models.retain(|_, entry| entry.is_fresh());
        let removed_sm = sm_before - self.semantic_models.len();

        self.locks
            .retain(|key, _| self.l1.contains_key(key) || self.semantic_models.contains_key(key));
        self.stats.record_maintenance(Utc::now());
        removed_l1 + removed_sm
    }

    pub fn clear(&self) {
        self.l1.clear();
        self.semantic_models.clear();
        self.locks.clear();
        let root = self.cache_root.join("compilation");
        let _ = fs::remove_dir_all(&root);
    }
}

impl<T, M> crate::maintenance::Maintainable for CompilationCacheTiers<T, M>
where
    T: Send + Sync + 'static,
    M: Send + Sync + 'static,
{
    fn run_maintenance(&self) -> usize {
        self.maintenance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Artifact {
        checksum: String,
    }

    #[derive(Debug, PartialEq)]
    struct SemanticModel {
        symbol_count: usize,
    }

    fn tiers(dir: &Path) -> CompilationCacheTiers<Artifact, SemanticModel> {
        let cfg = CacheConfig::default().with_cache_root(dir);
        CompilationCacheTiers::new(&cfg, TierExpirations::default())
    }

    fn request(key: &str, sources: &[PathBuf]) -> CompilationRequest {
        CompilationRequest {
            key: key.to_string(),
            assembly_name: "Sample".into(),
            language: "C#".into(),
            source_files: sources.to_vec(),
            reference_paths: vec![],
        }
    }

    #[test]
    fn miss_then_create_then_hit_from_l1() {
        let dir = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let src = project.path().join("Foo.cs");
        fs::write(&src, "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let req = request("k1", &[src]);
        let calls = AtomicUsize::new(0);

        let got = t.get_or_create_compilation(&req, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Artifact { checksum: "abc".into() }
        });
        assert_eq!(got.checksum, "abc");

        let got_again = t.get_or_create_compilation(&req, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Artifact { checksum: "should-not-run".into() }
        });
        assert_eq!(got_again.checksum, "abc");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(t.statistics().snapshot().hits, 1);
    }

    #[test]
    fn l3_manifest_survives_l1_eviction_but_still_recompiles() {
        let dir = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let src = project.path().join("Foo.cs");
        fs::write(&src, "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let req = request("k2", &[src]);
        t.get_or_create_compilation(&req, |_| Artifact { checksum: "xyz".into() });
        t.l1.clear();

        let calls = AtomicUsize::new(0);
        let got = t.get_or_create_compilation(&req, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Artifact { checksum: "xyz".into() }
        });
        assert_eq!(got.checksum, "xyz");
        assert_eq!(calls.load(Ordering::SeqCst), 1, "L3 manifest hit still needs the factory to rebuild T");
        assert!(t.l1.contains_key("k2"), "L3 hit should promote the manifest back to L1");
    }

    #[test]
    fn source_file_touched_inside_ttl_window_invalidates_entry() {
        let dir = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let src = project.path().join("Foo.cs");
        fs::write(&src, "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let req = request("k3", &[src.clone()]);
        t.get_or_create_compilation(&req, |_| Artifact { checksum: "v1".into() });

        // TTL is 30 minutes by default -- still well within it, but the
        // source file changed underneath the cache, so the entry must be
        // rebuilt, not served stale.
        std::thread::sleep(Duration::from_millis(10));
        fs::write(&src, "class Foo { void Bar() {} }").unwrap();

        let calls = AtomicUsize::new(0);
        let got = t.get_or_create_compilation(&req, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Artifact { checksum: "v2".into() }
        });
        assert_eq!(got.checksum, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(t.statistics().snapshot().invalidations >= 1);
    }

    #[test]
    fn missing_source_file_fails_validity() {
        let dir = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let src = project.path().join("Foo.cs");
        fs::write(&src, "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let req = request("k4", &[src.clone()]);
        t.get_or_create_compilation(&req, |_| Artifact { checksum: "v1".into() });

        fs::remove_file(&src).unwrap();
        t.l1.clear();

        let calls = AtomicUsize::new(0);
        t.get_or_create_compilation(&req, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Artifact { checksum: "v2".into() }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn live_reference_paths_falls_back_to_defaults_when_all_missing() {
        let dir = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let src = project.path().join("Foo.cs");
        fs::write(&src, "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let mut req = request("k5", &[src]);
        req.reference_paths = vec![PathBuf::from("/nonexistent/Some.Missing.dll")];
        let got = t.get_or_create_compilation(&req, |_| Artifact { checksum: "v1".into() });
        let _ = got;

        let manifest = t.read_l3("k5").unwrap();
        let live = manifest.live_reference_paths();
        assert!(!live.is_empty());
        assert!(live.iter().all(|p| DEFAULT_REFERENCE_PATHS.contains(&p.to_str().unwrap())));
    }

    #[test]
    fn get_or_create_semantic_model_caches_by_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let calls = AtomicUsize::new(0);
        let make = |_: &Path| {
            calls.fetch_add(1, Ordering::SeqCst);
            SemanticModel { symbol_count: 3 }
        };

        let first = t.get_or_create_semantic_model(file.path(), make);
        let second = t.get_or_create_semantic_model(file.path(), make);
        assert_eq!(first.symbol_count, 3);
        assert_eq!(second.symbol_count, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn semantic_model_recomputes_when_file_mtime_advances() {
        let dir = tempfile::tempdir().unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "v1").unwrap();

        let t = tiers(dir.path());
        t.get_or_create_semantic_model(file.path(), |_| SemanticModel { symbol_count: 1 });

        std::thread::sleep(Duration::from_millis(10));
        fs::write(file.path(), "v2 longer").unwrap();

        let calls = AtomicUsize::new(0);
        let got = t.get_or_create_semantic_model(file.path(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            SemanticModel { symbol_count: 2 }
        });
        assert_eq!(got.symbol_count, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn maintenance_evicts_entries_whose_source_file_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let src = project.path().join("Foo.cs");
        fs::write(&src, "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let req = request("k6", &[src.clone()]);
        t.get_or_create_compilation(&req, |_| Artifact { checksum: "v1".into() });
        fs::remove_file(&src).unwrap();

        let removed = t.maintenance();
        assert_eq!(removed, 1);
        assert!(!t.l1.contains_key("k6"));
    }

    #[test]
    fn invalidate_bumps_invalidations_once_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let src = project.path().join("Foo.cs");
        fs::write(&src, "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let req = request("k7", &[src]);
        t.get_or_create_compilation(&req, |_| Artifact { checksum: "v1".into() });

        t.invalidate("k7");
        assert_eq!(t.statistics().snapshot().invalidations, 1);
        assert!(!t.l1.contains_key("k7"));

        t.invalidate("k7");
        assert_eq!(t.statistics().snapshot().invalidations, 1);
    }

    #[test]
    fn clear_removes_l1_and_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let src = project.path().join("Foo.cs");
        fs::write(&src, "class Foo {}").unwrap();

        let t = tiers(dir.path());
        let req = request("k8", &[src]);
        t.get_or_create_compilation(&req, |_| Artifact { checksum: "v".into() });
        t.clear();

        assert!(t.read_l3("k8").is_none());
        assert!(!t.l1.contains_key("k8"));
    }
}
