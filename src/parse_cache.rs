//! Cache for parsed-source results
//!
//! Keys on the SHA-256 of the file's *absolute path* (stable across
//! runs), validates on the SHA-256 of the file's *content* plus its
//! mtime — an edit in place changes the fingerprint, a touch without an
//! edit changes the mtime; either invalidates the entry as stale.

use std::path::Path;

use crate::cache::{CacheLookup, ContentCache, Freshness};
use crate::config::CacheConfig;
use crate::model::{ClassInfo, SourceParser};

/// Entry filename suffix for parse-cache records
const PARSE_EXT: &str = ".json";

/// Content-validated cache for [`ClassInfo`] parse results
pub struct ParseCache {
    cache: ContentCache,
}

impl ParseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: ContentCache::new(config, PARSE_EXT),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Fetch the cached parse for `file` if the file is unchanged since
    /// the entry was written. Any staleness or corruption reads as a
    /// miss to the caller; the detailed outcome is still logged.
    pub fn get(&self, file: &Path) -> Option<ClassInfo> {
        let fingerprint = crate::hash::file_fingerprint(file)?;
        let freshness = Freshness {
            fingerprint,
            source_mtime_millis: crate::hash::file_mtime_millis(file),
        };
        let key = crate::hash::path_key(file);
        match self.cache.lookup(&key, Some(&freshness)) {
            CacheLookup::Hit(info) => Some(info),
            CacheLookup::Miss => None,
            CacheLookup::Expired => {
                tracing::debug!(file = %file.display(), "Parse cache entry stale");
                None
            }
            CacheLookup::Corrupted => {
                tracing::debug!(file = %file.display(), "Parse cache entry corrupted");
                None
            }
        }
    }

    /// Record a parse result for `file`. Skipped when the file's content
    /// cannot be fingerprinted (nothing to validate against later).
    pub fn put(&self, file: &Path, info: &ClassInfo) {
        let Some(fingerprint) = crate::hash::file_fingerprint(file) else {
            return;
        };
        let key = crate::hash::path_key(file);
        self.cache.insert(&key, info, &fingerprint);
    }

    /// Cache-aside parse: serve a fresh entry, otherwise invoke the
    /// parser and record its result
    pub fn get_or_parse(&self, file: &Path, parser: &dyn SourceParser) -> Option<ClassInfo> {
        if let Some(info) = self.get(file) {
            return Some(info);
        }
        let info = parser.parse_class(file)?;
        self.put(file, &info);
        Some(info)
    }

    pub fn invalidate(&self, file: &Path) {
        self.cache.invalidate(&crate::hash::path_key(file));
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodInfo, Visibility};

    fn sample_class() -> ClassInfo {
        ClassInfo {
            package: "com.example".into(),
            name: "Calculator".into(),
            methods: vec![MethodInfo {
                name: "add".into(),
                visibility: Visibility::Public,
                is_abstract: false,
            }],
        }
    }

    fn cache_in(dir: &Path) -> ParseCache {
        ParseCache::new(CacheConfig {
            enabled: true,
            directory: dir.join("cache"),
            max_age_minutes: 60,
            max_size_mb: 10,
        })
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Calculator.java");
        std::fs::write(&src, "class Calculator {}").unwrap();

        let cache = cache_in(dir.path());
        assert!(cache.get(&src).is_none());

        cache.put(&src, &sample_class());
        let hit = cache.get(&src).expect("entry should be fresh");
        assert_eq!(hit.name, "Calculator");
        assert_eq!(hit.methods.len(), 1);
    }

    #[test]
    fn test_content_change_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Calculator.java");
        std::fs::write(&src, "class Calculator {}").unwrap();

        let cache = cache_in(dir.path());
        cache.put(&src, &sample_class());

        std::fs::write(&src, "class Calculator { int extra; }").unwrap();
        assert!(
            cache.get(&src).is_none(),
            "Edited file must not serve the stale parse"
        );
    }

    #[test]
    fn test_missing_source_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Gone.java");
        std::fs::write(&src, "class Gone {}").unwrap();

        let cache = cache_in(dir.path());
        cache.put(&src, &sample_class());
        std::fs::remove_file(&src).unwrap();
        assert!(cache.get(&src).is_none());
    }

    #[test]
    fn test_get_or_parse_invokes_parser_once() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingParser(AtomicU32);
        impl SourceParser for CountingParser {
            fn parse_class(&self, _file: &Path) -> Option<ClassInfo> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Some(sample_class())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Calculator.java");
        std::fs::write(&src, "class Calculator {}").unwrap();

        let cache = cache_in(dir.path());
        let parser = CountingParser(AtomicU32::new(0));
        assert!(cache.get_or_parse(&src, &parser).is_some());
        assert!(cache.get_or_parse(&src, &parser).is_some());
        assert_eq!(parser.0.load(Ordering::SeqCst), 1, "Second call must hit the cache");
    }

    #[test]
    fn test_invalidate_specific_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Calculator.java");
        std::fs::write(&src, "class Calculator {}").unwrap();

        let cache = cache_in(dir.path());
        cache.put(&src, &sample_class());
        cache.invalidate(&src);
        assert!(cache.get(&src).is_none());
    }
}
