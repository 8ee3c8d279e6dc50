//! Domain-aware cache of [`CallGraph`] values, keyed by project path and
//! validated against a content fingerprint, compiler version, and
//! dependency hashes before being trusted as fresh.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use tia_core::{fingerprint, CacheStatistics, CallGraph};
use tracing::{debug, warn};

use crate::blob_store::{CompressedBlobStore, RawLookup};
use crate::config::CacheConfig;

const SOURCE_EXTENSIONS: &[&str] = &["cs", "vb", "fs", "csproj", "vbproj", "fsproj"];
const MAX_INTEGRITY_ISSUES: usize = 50;

/// A stored call graph plus the fingerprint metadata needed to decide
/// whether it is still valid for the project it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CallGraphEntry {
    graph: CallGraph,
    fingerprint: String,
    compiler_version: String,
    dependency_hashes: Vec<String>,
}

/// Caches one [`CallGraph`] per project, invalidating automatically when
/// source files, the compiler version, or dependencies change underneath
/// it.
pub struct CallGraphCache {
    store: CompressedBlobStore,
    tracked_projects: DashSet<PathBuf>,
}

impl CallGraphCache {
    pub fn open(config: CacheConfig) -> Result<Self, crate::error::StorageError> {
        Ok(CallGraphCache {
            store: CompressedBlobStore::open("call_graph", config)?,
            tracked_projects: DashSet::new(),
        })
    }

    pub fn statistics(&self) -> Arc<CacheStatistics> {
        self.store.statistics()
    }

    fn cache_key(project_path: &Path, compiler_version: &str, dep_hashes: &[String]) -> String {
        fingerprint::cache_key(&project_path.to_string_lossy(), compiler_version, dep_hashes)
    }

    /// Content fingerprint of every tracked source file under
    /// `project_path`, combining per-file path/mtime/length hashes.
    fn project_fingerprint(project_path: &Path) -> String {
        let mut file_hashes = Vec::new();
        collect_source_files(project_path, &mut file_hashes);
        file_hashes.sort();
        let joined = file_hashes.join("\n");
        blake3::hash(joined.as_bytes()).to_hex().to_string()
    }

    /// Looks up the call graph for `project_path`, returning `None` if
    /// absent or stale (source files changed, compiler version changed,
    /// a dependency changed, or the stored graph fails integrity
    /// checking).
    ///
    /// Statistics are owned at this layer rather than the underlying
    /// blob store's: a blob-level hit that this validation rejects must
    /// never be counted as a hit, and a missing key for a project this
    /// cache has seen before (the dependency set changed, producing a
    /// different cache key) counts as an invalidation, not a miss.
    pub fn get(
        &self,
        project_path: &Path,
        compiler_version: &str,
        dep_hashes: &[String],
    ) -> Option<CallGraph> {
        let key = Self::cache_key(project_path, compiler_version, dep_hashes);
        let stats = self.store.statistics();
        let was_tracked = self.tracked_projects.contains(project_path);

        let entry: CallGraphEntry = match self.store.get_raw(&key) {
            RawLookup::Hit(entry) => entry,
            RawLookup::Missing => {
                if was_tracked {
                    debug!(project = %project_path.display(), "call graph invalidated: no entry for tracked project");
                    stats.record_invalidation();
                } else {
                    stats.record_miss();
                }
                return None;
            }
            RawLookup::Expired => {
                debug!(project = %project_path.display(), "call graph invalidated: entry expired");
                self.store.remove(&key);
                stats.record_invalidation();
                return None;
            }
            RawLookup::Corrupt => {
                warn!(project = %project_path.display(), "call graph entry corrupt");
                self.store.remove(&key);
                stats.record_corruption();
                return None;
            }
        };

        if entry.compiler_version != compiler_version {
            debug!(project = %project_path.display(), "call graph invalidated: compiler version changed");
            self.store.remove(&key);
            stats.record_invalidation();
            return None;
        }
        if entry.dependency_hashes != dep_hashes {
            debug!(project = %project_path.display(), "call graph invalidated: dependency hashes changed");
            self.store.remove(&key);
            stats.record_invalidation();
            return None;
        }
        let current_fingerprint = Self::project_fingerprint(project_path);
        if entry.fingerprint != current_fingerprint {
            debug!(project = %project_path.display(), "call graph invalidated: source fingerprint changed");
            self.store.remove(&key);
            stats.record_invalidation();
            return None;
        }

        let report = entry.graph.check_integrity(MAX_INTEGRITY_ISSUES);
        if !report.is_valid {
            warn!(
                project = %project_path.display(),
                issues = report.issues.len(),
                "call graph failed integrity check, treating as corruption"
            );
            self.store.remove(&key);
            stats.record_corruption();
            return None;
        }

        stats.record_hit();
        self.tracked_projects.insert(project_path.to_path_buf());
        Some(entry.graph)
    }

    /// Stores `graph` for `project_path`, fingerprinted against its
    /// current source tree, compiler version, and dependencies.
    pub fn store(
        &self,
        project_path: &Path,
        graph: CallGraph,
        compiler_version: &str,
        dep_hashes: &[String],
        ttl: Option<Duration>,
    ) -> Result<(), crate::error::StorageError> {
        let key = Self::cache_key(project_path, compiler_version, dep_hashes);
        let entry = CallGraphEntry {
            graph,
            fingerprint: Self::project_fingerprint(project_path),
            compiler_version: compiler_version.to_string(),
            dependency_hashes: dep_hashes.to_vec(),
        };
        self.store.set(&key, &entry, ttl)?;
        self.tracked_projects.insert(project_path.to_path_buf());
        Ok(())
    }

    /// Explicitly evicts the cached entry for `project_path`, regardless
    /// of compiler version or dependencies, used by file-watch
    /// invalidation. Bumps `invalidations` once per entry actually
    /// removed.
    pub fn invalidate(&self, project_path: &Path, compiler_version: &str, dep_hashes: &[String]) {
        let key = Self::cache_key(project_path, compiler_version, dep_hashes);
        if self.store.remove(&key) {
            self.store.statistics().record_invalidation();
        }
    }

    pub fn maintenance(&self) -> usize {
        self.store.maintenance()
    }

    pub fn clear(&self) {
        self.store.clear();
        self.tracked_projects.clear();
    }

    pub fn tracked_project_count(&self) -> usize {
        self.tracked_projects.len()
    }
}

fn collect_source_files(dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == "bin" || n == "obj" || n.starts_with('.'))
            {
                continue;
            }
            collect_source_files(&path, out);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
        {
            out.push(fingerprint::hash_path_stat(&path));
        }
    }
}

impl crate::maintenance::Maintainable for CallGraphCache {
    fn run_maintenance(&self) -> usize {
        self.maintenance()
    }
}
