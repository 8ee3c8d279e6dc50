//! Low-level atomic, compressed blob I/O shared by [`crate::blob_store`]
//! and the on-disk manifest tier of [`crate::compilation_tiers`].
//!
//! Every write goes through a `.tmp` file followed by a rename so a reader
//! never observes a partially-written blob. Every blob carries its own
//! small header (creation time, TTL, uncompressed size) so that no sidecar
//! file is ever required for correctness -- deleting the cache root is
//! always safe.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::config::CompressionLevel;
use crate::error::StorageError;

const MAGIC: &[u8; 4] = b"TIAB";

/// A decoded blob: its payload bytes plus the header fields a caller needs
/// to decide whether the entry is still fresh.
pub struct DecodedBlob {
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
}

/// Compresses `payload` and atomically writes it to `path`, preceded by a
/// fixed-size header: magic(4) + created_at_unix_millis(8) + ttl_secs(8) +
/// uncompressed_size(8).
pub fn write_atomic(
    path: &Path,
    payload: &[u8],
    created_at: DateTime<Utc>,
    ttl: Duration,
    level: CompressionLevel,
) -> Result<u64, StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(StorageError::RootUnavailable)?;
    }

    let mut encoder = GzEncoder::new(Vec::new(), level.to_flate2());
    encoder.write_all(payload).map_err(StorageError::Compression)?;
    let compressed = encoder.finish().map_err(StorageError::Compression)?;

    let mut buf = Vec::with_capacity(4 + 8 + 8 + 8 + compressed.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&created_at.timestamp_millis().to_le_bytes());
    buf.extend_from_slice(&ttl.as_secs().to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(&compressed);

    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = fs::File::create(&tmp_path).map_err(StorageError::WriteFailed)?;
        tmp.write_all(&buf).map_err(StorageError::WriteFailed)?;
        tmp.sync_all().map_err(StorageError::WriteFailed)?;
    }
    fs::rename(&tmp_path, path).map_err(StorageError::WriteFailed)?;

    Ok(buf.len() as u64)
}

/// Reads and decompresses a blob written by [`write_atomic`].
///
/// Returns `None` (never `Err`) on any I/O error or malformed header --
/// per the failure semantics for this store, a corrupt or unreadable blob
/// is indistinguishable from a missing one to the caller, which is
/// responsible for bumping the corruption counter and removing the file.
pub fn read_decoded(path: &Path) -> Option<DecodedBlob> {
    let raw = fs::read(path).ok()?;
    if raw.len() < 28 || &raw[0..4] != MAGIC {
        return None;
    }

    let created_millis = i64::from_le_bytes(raw[4..12].try_into().ok()?);
    let ttl_secs = u64::from_le_bytes(raw[12..20].try_into().ok()?);
    let uncompressed_size = u64::from_le_bytes(raw[20..28].try_into().ok()?);
    let compressed = &raw[28..];

    let mut decoder = GzDecoder::new(compressed);
    let mut payload = Vec::with_capacity(uncompressed_size as usize);
    decoder.read_to_end(&mut payload).ok()?;

    let created_at = Utc.timestamp_millis_opt(created_millis).single()?;

    Some(DecodedBlob {
        payload,
        created_at,
        ttl: Duration::from_secs(ttl_secs),
        uncompressed_size,
        compressed_size: raw.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_payload_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.blob");
        let now = Utc::now();

        write_atomic(&path, b"hello world", now, Duration::from_secs(60), CompressionLevel::Best).unwrap();
        let decoded = read_decoded(&path).unwrap();

        assert_eq!(decoded.payload, b"hello world");
        assert_eq!(decoded.uncompressed_size, 11);
        assert_eq!(decoded.ttl, Duration::from_secs(60));
        assert!((decoded.created_at.timestamp_millis() - now.timestamp_millis()).abs() < 5);
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.blob");
        assert!(read_decoded(&path).is_none());
    }

    #[test]
    fn truncated_file_reads_as_none_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.blob");
        fs::write(&path, b"too short").unwrap();
        assert!(read_decoded(&path).is_none());
    }

    #[test]
    fn wrong_magic_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.blob");
        let mut buf = vec![0u8; 40];
        buf[0..4].copy_from_slice(b"NOPE");
        fs::write(&path, buf).unwrap();
        assert!(read_decoded(&path).is_none());
    }

    #[test]
    fn write_is_atomic_via_tmp_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.blob");
        write_atomic(&path, b"data", Utc::now(), Duration::from_secs(1), CompressionLevel::Fast).unwrap();
        assert!(!path.with_extension("tmp").exists());
        assert!(path.exists());
    }
}
