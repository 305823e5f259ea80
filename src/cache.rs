//! LRU cache of compiled documents.
//!
//! ## Cache Key Design
//!
//! The key is xxh64 over everything that determines the output:
//!
//! - `source_hash`: SHA-256 of the canonical source text
//! - `policy_params_hash`: hash of every policy parameter
//! - `schema_version`: output schema version
//!
//! Changing the input, any policy parameter or the schema version can never
//! serve a stale document. Entries are shared as `Arc<CompiledDocument>`.

use lru::LruCache;
use parking_lot::RwLock;
use std::hash::Hasher;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use xxhash_rust::xxh64::Xxh64;

use crate::compiler::CompiledDocument;
use crate::SEMHYP_SCHEMA_VERSION;

const DEFAULT_MAX_ENTRIES: usize = 256;

/// Configuration for the document cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached documents.
    pub max_entries: usize,
    /// Whether caching is enabled.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Disabled cache.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DocumentCacheKey(u64);

impl DocumentCacheKey {
    fn compute(source_hash: &str, policy_params_hash: &str) -> Self {
        let mut hasher = Xxh64::new(0);
        hasher.write(source_hash.as_bytes());
        hasher.write(policy_params_hash.as_bytes());
        hasher.write(SEMHYP_SCHEMA_VERSION.as_bytes());
        Self(hasher.finish())
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that missed.
    pub misses: u64,
}

/// Thread-safe LRU cache of compiled documents.
#[derive(Debug)]
pub struct DocumentCache {
    cache: Option<Arc<RwLock<LruCache<DocumentCacheKey, Arc<CompiledDocument>>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DocumentCache {
    /// Create a cache; a disabled config yields a cache that never stores.
    pub fn new(config: CacheConfig) -> Self {
        let cache = config.enabled.then(|| {
            let size = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
            Arc::new(RwLock::new(LruCache::new(size)))
        });
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a compiled document.
    pub fn get(&self, source_hash: &str, policy_params_hash: &str) -> Option<Arc<CompiledDocument>> {
        let cache = self.cache.as_ref()?;
        let key = DocumentCacheKey::compute(source_hash, policy_params_hash);
        let found = cache.read().peek(&key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a compiled document.
    pub fn insert(&self, source_hash: &str, policy_params_hash: &str, document: Arc<CompiledDocument>) {
        if let Some(cache) = &self.cache {
            let key = DocumentCacheKey::compute(source_hash, policy_params_hash);
            cache.write().put(key, document);
        }
    }

    /// Get cache statistics.
    ///
    /// Returns `None` if caching is disabled.
    pub fn stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| {
            let cache = cache.read();
            CacheStats {
                len: cache.len(),
                cap: cache.cap().get(),
                hits: self.hits.load(Ordering::Relaxed),
                misses: self.misses.load(Ordering::Relaxed),
            }
        })
    }

    /// Clear the cache.
    ///
    /// Does nothing if caching is disabled.
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::HypergraphCompiler;
    use crate::policy::CompilePolicy;

    const TABLE: &str = "0\t0\tDogs\t+\tdog\tNOUN\tNNS\tnsubj\t1\n0\t1\tbark\t-\tbark\tVERB\tVBP\tROOT\t1\n";

    fn document() -> Arc<CompiledDocument> {
        Arc::new(HypergraphCompiler::new(CompilePolicy::default()).compile_str(TABLE))
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = DocumentCache::new(CacheConfig::default());
        assert!(cache.get("src", "params").is_none());
        cache.insert("src", "params", document());
        assert!(cache.get("src", "params").is_some());

        let stats = cache.stats().unwrap();
        assert_eq!(stats.len, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_key_covers_policy() {
        let cache = DocumentCache::new(CacheConfig::default());
        cache.insert("src", "params-a", document());
        assert!(cache.get("src", "params-b").is_none());
        assert!(cache.get("other", "params-a").is_none());
    }

    #[test]
    fn test_eviction_respects_capacity() {
        let cache = DocumentCache::new(CacheConfig {
            max_entries: 2,
            enabled: true,
        });
        let doc = document();
        for source in ["a", "b", "c"] {
            cache.insert(source, "p", Arc::clone(&doc));
        }
        let stats = cache.stats().unwrap();
        assert_eq!(stats.len, 2);
        assert_eq!(stats.cap, 2);
        assert!(cache.get("a", "p").is_none());
        assert!(cache.get("c", "p").is_some());
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let cache = DocumentCache::new(CacheConfig::disabled());
        cache.insert("src", "params", document());
        assert!(cache.get("src", "params").is_none());
        assert!(cache.stats().is_none());
    }

    #[test]
    fn test_clear() {
        let cache = DocumentCache::new(CacheConfig::default());
        cache.insert("src", "params", document());
        cache.clear();
        assert_eq!(cache.stats().unwrap().len, 0);
    }
}
