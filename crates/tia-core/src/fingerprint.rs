//! Stable fingerprints for paths, file stat tuples, and cache keys.
//!
//! Uses blake3 as the 256-bit cryptographic digest, following the same
//! choice the storage layer uses for content hashing. All fingerprints are
//! lowercase hex.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Byte that never appears in a path, used to separate components before
/// hashing so that concatenation cannot create ambiguous collisions.
const SEPARATOR: u8 = 0x1f;

/// Computes a stable fingerprint for a file: `path || last_write_time_utc_iso || length_bytes`.
///
/// If the file cannot be stat'd (missing, permission denied), falls back to
/// hashing the path alone -- stable but weaker, since it won't detect
/// content changes. Callers should log a warning on fallback; this
/// function itself never fails.
pub fn hash_path_stat(path: &Path) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(path.to_string_lossy().as_bytes());

    match fs::metadata(path).and_then(|meta| {
        let modified = meta.modified()?;
        Ok((modified, meta.len()))
    }) {
        Ok((modified, len)) => {
            let iso = chrono::DateTime::<chrono::Utc>::from(modified).to_rfc3339();
            hasher.update(&[SEPARATOR]);
            hasher.update(iso.as_bytes());
            hasher.update(&[SEPARATOR]);
            hasher.update(&len.to_le_bytes());
        }
        Err(_) => {
            tracing::warn!(path = %path.display(), "path stat failed, falling back to path-only fingerprint");
        }
    }

    to_hex(hasher.finalize().as_bytes())
}

/// Computes the cache key for a project build: a digest over the project
/// path, compiler version, and sorted dependency hashes.
///
/// Sorting `dep_hashes` first makes the key independent of the order the
/// caller happened to enumerate dependencies in.
pub fn cache_key(project_path: &str, compiler_version: &str, dep_hashes: &[String]) -> String {
    let mut sorted = dep_hashes.to_vec();
    sorted.sort();

    let mut hasher = blake3::Hasher::new();
    hasher.update(project_path.as_bytes());
    hasher.update(&[SEPARATOR]);
    hasher.update(compiler_version.as_bytes());
    for dep in &sorted {
        hasher.update(&[SEPARATOR]);
        hasher.update(dep.as_bytes());
    }

    to_hex(hasher.finalize().as_bytes())
}

/// Hashes a set of dependency identifiers (e.g. assembly paths) into their
/// individual stat-based fingerprints, sorted for determinism.
pub fn hash_dependencies(dep_paths: &[impl AsRef<Path>]) -> Vec<String> {
    let mut hashes: Vec<String> = dep_paths.iter().map(|p| hash_path_stat(p.as_ref())).collect();
    hashes.sort();
    hashes
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").expect("String writer never fails");
    }
    s
}
