//! Content-addressable file cache with TTL expiry and size-bounded eviction
//!
//! Entries are JSON files sharded by the first two hex characters of
//! their key: `{root}/{hh}/{key}{ext}`. Sharding bounds per-directory
//! fan-out regardless of corpus size.
//!
//! Lookup outcomes are explicit values, never exceptions-as-control-flow:
//! a miss, an expired entry, and a corrupted entry are three distinct
//! [`CacheLookup`] variants, and the latter two self-heal by deleting
//! the backing file.
//!
//! Caching is an optimization, never a hard dependency: disk failures on
//! write are logged and swallowed, and a cache whose root cannot be
//! created degrades to disabled rather than failing the host operation.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CacheConfig;

/// Internal cache I/O errors; public methods log these and degrade
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result of a cache read
#[derive(Debug, PartialEq)]
pub enum CacheLookup<V> {
    /// Fresh entry found
    Hit(V),
    /// No entry on disk (or cache disabled)
    Miss,
    /// Entry present but stale (TTL or source fingerprint/mtime); deleted
    Expired,
    /// Entry present but undeserializable; deleted
    Corrupted,
}

impl<V> CacheLookup<V> {
    /// Collapse to the payload; every non-hit is `None`
    pub fn into_value(self) -> Option<V> {
        match self {
            CacheLookup::Hit(v) => Some(v),
            _ => None,
        }
    }
}

/// One persisted cache record
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub payload: V,
    /// Wall-clock write time, epoch milliseconds
    pub written_at_epoch_millis: i64,
    /// Content hash of the input this entry was derived from. Distinct
    /// from the cache key when the key hashes something else (the parse
    /// cache keys on path, fingerprints on content).
    pub source_fingerprint: String,
}

/// Expected freshness for caches that validate content, not just TTL
#[derive(Debug, Clone)]
pub struct Freshness {
    /// Freshly computed content hash the stored fingerprint must equal
    pub fingerprint: String,
    /// Source mtime; an entry written before this is stale
    pub source_mtime_millis: Option<i64>,
}

/// Point-in-time scan of the cache directory
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_size_bytes: u64,
    pub directory: PathBuf,
}

/// Hash-keyed, sharded, TTL- and size-bounded file store.
///
/// Concurrency: writes to the same key race last-writer-wins, which is
/// harmless because entries are derivable from their input — a lost
/// write is a future miss, not corruption. Eviction only ever deletes
/// files it observed in its snapshot, so a concurrent brand-new write is
/// never targeted.
pub struct ContentCache {
    config: CacheConfig,
    /// Entry filename suffix, e.g. `.json` or `.llm.json`
    extension: &'static str,
}

impl ContentCache {
    /// Open a cache rooted at `config.directory`.
    ///
    /// If the root cannot be created the cache degrades to disabled
    /// instead of failing the host process.
    pub fn new(mut config: CacheConfig, extension: &'static str) -> Self {
        if config.enabled {
            if let Err(e) = std::fs::create_dir_all(&config.directory) {
                tracing::warn!(
                    directory = %config.directory.display(),
                    error = %e,
                    "Could not create cache directory; caching disabled"
                );
                config.enabled = false;
            }
        }
        Self { config, extension }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Sharded path for a key: `{root}/{hh}/{key}{ext}`
    fn entry_path(&self, key: &str) -> PathBuf {
        let shard = if key.len() >= 2 { &key[..2] } else { key };
        self.config
            .directory
            .join(shard)
            .join(format!("{}{}", key, self.extension))
    }

    /// Read the entry for `key`, enforcing TTL and optional content freshness.
    ///
    /// Expired and corrupted entries are deleted eagerly so subsequent
    /// reads do not repeat the staleness check.
    pub fn lookup<V: DeserializeOwned>(
        &self,
        key: &str,
        freshness: Option<&Freshness>,
    ) -> CacheLookup<V> {
        if !self.config.enabled {
            return CacheLookup::Miss;
        }
        let path = self.entry_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheLookup::Miss,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cache read failed");
                return CacheLookup::Miss;
            }
        };

        // TTL by on-disk write time
        if self.is_past_ttl(&path) {
            tracing::debug!(key, "Cache entry past TTL, deleting");
            self.remove_quietly(&path);
            return CacheLookup::Expired;
        }

        let entry: CacheEntry<V> = match serde_json::from_slice(&bytes) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupted cache entry, deleting");
                self.remove_quietly(&path);
                return CacheLookup::Corrupted;
            }
        };

        // Content freshness: fingerprint must match and the source must
        // not have been modified after the entry was written. Mismatch
        // is staleness, not corruption.
        if let Some(expected) = freshness {
            let fingerprint_ok = entry.source_fingerprint == expected.fingerprint;
            let mtime_ok = expected
                .source_mtime_millis
                .is_none_or(|m| m <= entry.written_at_epoch_millis);
            if !fingerprint_ok || !mtime_ok {
                tracing::debug!(key, fingerprint_ok, mtime_ok, "Stale cache entry, deleting");
                self.remove_quietly(&path);
                return CacheLookup::Expired;
            }
        }

        CacheLookup::Hit(entry.payload)
    }

    /// Write an entry for `key`. No-op when the cache is disabled; disk
    /// failures are logged and swallowed. A successful write triggers
    /// the post-write size check.
    pub fn insert<V: Serialize>(&self, key: &str, payload: &V, source_fingerprint: &str) {
        if !self.config.enabled {
            return;
        }
        let entry = CacheEntry {
            payload,
            written_at_epoch_millis: now_millis(),
            source_fingerprint: source_fingerprint.to_string(),
        };
        match self.write_entry(key, &entry) {
            Ok(()) => self.enforce_size_limit(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache write failed; continuing uncached");
            }
        }
    }

    fn write_entry<V: Serialize>(&self, key: &str, entry: &V) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Atomic within the shard: write a sibling temp file, then rename
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(entry)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Unconditionally delete the entry for `key`, if present
    pub fn invalidate(&self, key: &str) {
        if !self.config.enabled {
            return;
        }
        self.remove_quietly(&self.entry_path(key));
    }

    /// Delete the entire cache directory tree
    pub fn clear(&self) {
        match std::fs::remove_dir_all(&self.config.directory) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    directory = %self.config.directory.display(),
                    error = %e,
                    "Failed to clear cache"
                );
            }
        }
    }

    /// Full recursive walk; intentionally a point-in-time scan, not cached
    pub fn stats(&self) -> CacheStats {
        let files = self.scan_entries();
        CacheStats {
            entry_count: files.len(),
            total_size_bytes: files.iter().map(|f| f.size).sum(),
            directory: self.config.directory.clone(),
        }
    }

    fn is_past_ttl(&self, path: &Path) -> bool {
        let Some(mtime) = crate::hash::file_mtime_millis(path) else {
            return false;
        };
        now_millis().saturating_sub(mtime) > self.config.max_age_millis()
    }

    /// Oldest-first eviction down to half the ceiling (hysteresis so the
    /// next few writes do not immediately re-trigger a pass)
    fn enforce_size_limit(&self) {
        let max = self.config.max_size_bytes();
        if max == 0 {
            return;
        }
        let mut files = self.scan_entries();
        let mut total: u64 = files.iter().map(|f| f.size).sum();
        if total <= max {
            return;
        }
        let target = max / 2;
        files.sort_by_key(|f| f.mtime_millis);
        let before = total;
        for file in &files {
            if total <= target {
                break;
            }
            self.remove_quietly(&file.path);
            total = total.saturating_sub(file.size);
        }
        tracing::info!(
            before_bytes = before,
            after_bytes = total,
            ceiling_bytes = max,
            "Cache size limit exceeded, evicted oldest entries"
        );
    }

    fn scan_entries(&self) -> Vec<EntryFile> {
        let mut out = Vec::new();
        let Ok(shards) = std::fs::read_dir(&self.config.directory) else {
            return out;
        };
        for shard in shards.flatten() {
            let shard_path = shard.path();
            if !shard_path.is_dir() {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(&shard_path) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let Ok(meta) = entry.metadata() else { continue };
                if !meta.is_file() {
                    continue;
                }
                out.push(EntryFile {
                    mtime_millis: crate::hash::file_mtime_millis(&path).unwrap_or(0),
                    size: meta.len(),
                    path,
                });
            }
        }
        out
    }

    fn remove_quietly(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "Failed to delete cache file");
            }
        }
    }
}

/// Wall clock as epoch milliseconds
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

struct EntryFile {
    path: PathBuf,
    mtime_millis: i64,
    size: u64,
}
