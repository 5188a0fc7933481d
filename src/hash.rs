//! SHA-256 fingerprints for cache keys and staleness checks
//!
//! Every cache key in utagent is the lowercase hex SHA-256 of a
//! canonicalized input. The same input must produce the same key across
//! process restarts, so canonicalization never depends on object
//! identity, map iteration order, or platform path separators beyond
//! what the caller already normalized.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex SHA-256 of arbitrary bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Key for path-addressed caches: hash of the absolute path string.
///
/// Falls back to the path as given when canonicalization fails (file
/// deleted between stat and hash) — the key is still deterministic for
/// that spelling of the path.
pub fn path_key(path: &Path) -> String {
    let canonical = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    sha256_hex(canonical.to_string_lossy().as_bytes())
}

/// Content fingerprint of a file's bytes, or `None` if unreadable.
pub fn file_fingerprint(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(sha256_hex(&bytes)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Could not read file for fingerprint");
            None
        }
    }
}

/// File mtime in milliseconds since the Unix epoch, or `None` if the
/// file is missing or its mtime predates the epoch.
pub fn file_mtime_millis(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_millis()).ok()
}

fn hex_encode(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        // SHA-256 of the empty string
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_deterministic() {
        assert_eq!(sha256_hex(b"hello"), sha256_hex(b"hello"));
        assert_ne!(sha256_hex(b"hello"), sha256_hex(b"hello "));
    }

    #[test]
    fn test_path_key_stable_for_missing_file() {
        let p = Path::new("/no/such/file/anywhere.java");
        assert_eq!(path_key(p), path_key(p));
    }

    #[test]
    fn test_file_fingerprint_missing() {
        assert!(file_fingerprint(Path::new("/no/such/file")).is_none());
    }

    #[test]
    fn test_file_fingerprint_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.java");
        std::fs::write(&file, "class A {}").unwrap();
        let first = file_fingerprint(&file).unwrap();
        std::fs::write(&file, "class A { int x; }").unwrap();
        let second = file_fingerprint(&file).unwrap();
        assert_ne!(first, second);
    }
}
