//! Cache-aside decorator for any [`ChatProvider`]
//!
//! On a hit the inner provider is never invoked; on a miss the inner
//! call is timed and only successful responses are written back.
//! Streaming requests bypass the cache entirely — partial output cannot
//! be replayed faithfully from a single cached blob.
//!
//! Callers cannot distinguish a cached from a live response through the
//! `ChatProvider` contract; the only side channel is [`ProviderMetrics`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::CacheLookup;
use crate::llm::{ChatProvider, ChatRequest, ChatResponse};
use crate::llm_cache::LlmResponseCache;

/// Hit/miss/latency counters, shareable across threads
#[derive(Debug, Default)]
pub struct ProviderMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    inner_millis: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// Total wall time spent in the inner provider, milliseconds
    pub inner_millis: u64,
}

impl ProviderMetrics {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inner_call(&self, elapsed_millis: u64) {
        self.inner_millis.fetch_add(elapsed_millis, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inner_millis: self.inner_millis.load(Ordering::Relaxed),
        }
    }
}

/// Wraps any provider (including a retrying one) with read-through /
/// write-through semantics against an [`LlmResponseCache`]
pub struct CachedProvider<P> {
    inner: P,
    cache: LlmResponseCache,
    metrics: Arc<ProviderMetrics>,
}

impl<P: ChatProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: LlmResponseCache) -> Self {
        Self {
            inner,
            cache,
            metrics: Arc::new(ProviderMetrics::default()),
        }
    }

    /// Handle to the hit/miss counters
    pub fn metrics(&self) -> Arc<ProviderMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl<P: ChatProvider> ChatProvider for CachedProvider<P> {
    fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        match self.cache.lookup_detailed(request) {
            CacheLookup::Hit(response) => {
                self.metrics.record_hit();
                tracing::debug!(model = %request.model, "LLM cache hit");
                return Ok(response);
            }
            outcome => {
                self.metrics.record_miss();
                tracing::debug!(model = %request.model, outcome = ?variant_name(&outcome), "LLM cache miss");
            }
        }

        let started = Instant::now();
        let response = self.inner.chat(request)?;
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.metrics.record_inner_call(elapsed);
        tracing::debug!(model = %request.model, elapsed_ms = elapsed, success = response.success, "LLM call completed");

        // put() itself refuses failed responses
        self.cache.put(request, &response);
        Ok(response)
    }

    /// Streaming never consults or populates the cache
    fn chat_stream(
        &self,
        request: &ChatRequest,
        sink: &mut dyn FnMut(&str),
    ) -> anyhow::Result<()> {
        self.inner.chat_stream(request, sink)
    }
}

fn variant_name(outcome: &CacheLookup<ChatResponse>) -> &'static str {
    match outcome {
        CacheLookup::Hit(_) => "hit",
        CacheLookup::Miss => "miss",
        CacheLookup::Expired => "expired",
        CacheLookup::Corrupted => "corrupted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::llm::ChatMessage;
    use std::sync::atomic::AtomicUsize;

    /// Counts invocations; fails when `fail` is set
    struct CountingProvider {
        calls: AtomicUsize,
        stream_calls: AtomicUsize,
        fail: bool,
    }

    impl CountingProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                stream_calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl ChatProvider for CountingProvider {
        fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Ok(ChatResponse::failure(&request.model, "backend down"))
            } else {
                Ok(ChatResponse::ok("live answer", &request.model))
            }
        }

        fn chat_stream(
            &self,
            _request: &ChatRequest,
            sink: &mut dyn FnMut(&str),
        ) -> anyhow::Result<()> {
            self.stream_calls.fetch_add(1, Ordering::SeqCst);
            sink("streamed");
            Ok(())
        }
    }

    fn cache_in(dir: &std::path::Path) -> LlmResponseCache {
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
            temperature: 0.0,
            max_tokens: 512,
            stream: false,
            messages: vec![ChatMessage::user("generate tests")],
        }
    }

    #[test]
    fn test_second_call_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CachedProvider::new(CountingProvider::new(false), cache_in(dir.path()));

        let first = provider.chat(&request()).unwrap();
        let second = provider.chat(&request()).unwrap();
        assert_eq!(first.content, second.content);
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1, "Hit must not invoke inner");

        let m = provider.metrics().snapshot();
        assert_eq!(m.hits, 1);
        assert_eq!(m.misses, 1);
    }

    #[test]
    fn test_failed_response_retried_next_call() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CachedProvider::new(CountingProvider::new(true), cache_in(dir.path()));

        provider.chat(&request()).unwrap();
        provider.chat(&request()).unwrap();
        assert_eq!(
            provider.inner.calls.load(Ordering::SeqCst),
            2,
            "Failure must not be served from cache"
        );
        assert_eq!(provider.metrics().snapshot().misses, 2);
    }

    #[test]
    fn test_streaming_bypasses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CachedProvider::new(CountingProvider::new(false), cache_in(dir.path()));

        // Warm the cache with a non-streaming call
        provider.chat(&request()).unwrap();

        let mut streamed = String::new();
        let mut req = request();
        req.stream = true;
        provider.chat_stream(&req, &mut |s| streamed.push_str(s)).unwrap();

        assert_eq!(streamed, "streamed");
        assert_eq!(
            provider.inner.stream_calls.load(Ordering::SeqCst),
            1,
            "Streaming must delegate even when a cached blob exists"
        );
        // Cache counters untouched by the streaming path
        assert_eq!(provider.metrics().snapshot().hits, 0);
    }

    #[test]
    fn test_disabled_cache_always_delegates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LlmResponseCache::new(CacheConfig {
            enabled: false,
            directory: dir.path().to_path_buf(),
            max_age_minutes: 60,
            max_size_mb: 10,
        });
        let provider = CachedProvider::new(CountingProvider::new(false), cache);
        provider.chat(&request()).unwrap();
        provider.chat(&request()).unwrap();
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 2);
    }
}
