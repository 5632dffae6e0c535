//! Result caches, injected into the [`Normalizer`](crate::Normalizer).
//!
//! A cache holds at most one entry per [`CacheKey`]. Entries are only
//! ever replaced wholesale, never mutated. Only successful results are
//! stored.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use pristine_pipeline::Treatment;

use crate::rendition::ProcessedImage;

/// Cache identity: the source plus the treatment applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Source identity (URL, path, or inline content key).
    pub source: String,
    /// Treatment applied.
    pub treatment: Treatment,
}

impl CacheKey {
    /// Key for `source` under `treatment`.
    #[must_use]
    pub fn new(source: impl Into<String>, treatment: Treatment) -> Self {
        Self {
            source: source.into(),
            treatment,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.source, self.treatment)
    }
}

/// Storage for processed results.
pub trait ResultCache: Send + Sync {
    /// The cached result for `key`, if any.
    fn get(&self, key: &CacheKey) -> Option<Arc<ProcessedImage>>;

    /// Store `value` under `key`, replacing any previous entry.
    fn put(&self, key: CacheKey, value: Arc<ProcessedImage>);

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded in-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Arc<ProcessedImage>>>,
}

impl MemoryCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<ProcessedImage>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: CacheKey, value: Arc<ProcessedImage>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Bounded cache evicting the least recently used entry.
#[derive(Debug)]
pub struct LruResultCache {
    entries: Mutex<LruCache<CacheKey, Arc<ProcessedImage>>>,
}

impl LruResultCache {
    /// A cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> NonZeroUsize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
    }
}

impl ResultCache for LruResultCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<ProcessedImage>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: CacheKey, value: Arc<ProcessedImage>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, value);
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Cache for a configured capacity: LRU when bounded, otherwise a plain
/// map.
#[must_use]
pub fn cache_for_capacity(capacity: usize) -> Arc<dyn ResultCache> {
    match NonZeroUsize::new(capacity) {
        Some(capacity) => Arc::new(LruResultCache::new(capacity)),
        None => Arc::new(MemoryCache::new()),
    }
}
