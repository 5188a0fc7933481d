//! Cache for LLM chat responses
//!
//! Lives under `{cache_root}/llm/` with `.llm.json` entries, keyed by
//! the canonical request fingerprint. Failed responses are never cached
//! — a transient vendor error must not become a sticky wrong answer.

use std::path::Path;

use crate::cache::{CacheLookup, ContentCache};
use crate::config::CacheConfig;
use crate::llm::{request_fingerprint, ChatRequest, ChatResponse};

/// Entry filename suffix distinguishing LLM records from parse records
const LLM_EXT: &str = ".llm.json";
/// Subtree of the cache root owned by this cache
const LLM_SUBDIR: &str = "llm";

/// Fingerprint-keyed response cache
pub struct LlmResponseCache {
    cache: ContentCache,
}

impl LlmResponseCache {
    /// Open the response cache under `config.directory/llm/`
    pub fn new(config: CacheConfig) -> Self {
        let config = CacheConfig {
            directory: config.directory.join(LLM_SUBDIR),
            ..config
        };
        Self {
            cache: ContentCache::new(config, LLM_EXT),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub fn get(&self, request: &ChatRequest) -> Option<ChatResponse> {
        let key = request_fingerprint(request);
        self.cache.lookup(&key, None).into_value()
    }

    /// Record a response. Failed responses are dropped here, not just in
    /// the decorator, so no future call path can cache them by accident.
    pub fn put(&self, request: &ChatRequest, response: &ChatResponse) {
        if !response.success {
            tracing::debug!(model = %request.model, "Not caching failed LLM response");
            return;
        }
        let key = request_fingerprint(request);
        self.cache.insert(&key, response, &key);
    }

    pub fn invalidate(&self, request: &ChatRequest) {
        self.cache.invalidate(&request_fingerprint(request));
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }
}

/// Expose the lookup with full outcome detail for metrics callers
impl LlmResponseCache {
    pub(crate) fn lookup_detailed(&self, request: &ChatRequest) -> CacheLookup<ChatResponse> {
        self.cache.lookup(&request_fingerprint(request), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn cache_in(dir: &Path) -> LlmResponseCache {
        LlmResponseCache::new(CacheConfig {
            enabled: true,
            directory: dir.to_path_buf(),
            max_age_minutes: 60,
            max_size_mb: 10,
        })
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            max_tokens: 1024,
            stream: false,
            messages: vec![ChatMessage::user("hi")],
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let req = request();
        assert!(cache.get(&req).is_none());

        cache.put(&req, &ChatResponse::ok("generated tests", "gpt-4o-mini"));
        let hit = cache.get(&req).expect("cached response");
        assert_eq!(hit.content, "generated tests");
        assert!(hit.success);
    }

    #[test]
    fn test_failed_response_never_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let req = request();
        cache.put(&req, &ChatResponse::failure("gpt-4o-mini", "rate limited"));
        assert!(cache.get(&req).is_none(), "Failures must not be cached");
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn test_entries_live_under_llm_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let req = request();
        cache.put(&req, &ChatResponse::ok("x", "m"));

        let key = request_fingerprint(&req);
        let path = dir
            .path()
            .join("llm")
            .join(&key[..2])
            .join(format!("{key}{LLM_EXT}"));
        assert!(path.exists(), "Expected entry at {}", path.display());
    }

    #[test]
    fn test_streaming_flag_shares_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let non_streaming = request();
        let mut streaming = request();
        streaming.stream = true;

        cache.put(&non_streaming, &ChatResponse::ok("same", "m"));
        assert!(cache.get(&streaming).is_some());
    }
}
