//! In-memory image cache tier.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, DisplayImage, ImageSource};
use crate::domain::ports::{CacheEntry, CacheTier};

/// In-process tier holding decoded images keyed by reference.
///
/// Unbounded unless built with [`MemoryImageCache::with_capacity`], in which
/// case the least recently used entry goes first.
pub struct MemoryImageCache {
    cache: RwLock<LruCache<String, DisplayImage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates an unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::from_lru(LruCache::unbounded())
    }

    /// Creates a cache holding at most `capacity` images.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self::from_lru(LruCache::new(cap))
    }

    fn from_lru(cache: LruCache<String, DisplayImage>) -> Self {
        Self {
            cache: RwLock::new(cache),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len().await,
        }
    }

    /// Peeks at an image without promoting it or touching the counters.
    pub async fn peek(&self, key: &CacheKey) -> Option<DisplayImage> {
        let cache = self.cache.read().await;
        cache.peek(&key.memory_key()).cloned()
    }

    /// Returns the number of cached images.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every cached image.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
        debug!("Cleared memory image cache");
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

#[async_trait::async_trait]
impl CacheTier for MemoryImageCache {
    fn source(&self) -> ImageSource {
        ImageSource::MemoryCache
    }

    async fn try_get(&self, key: &CacheKey) -> Option<DisplayImage> {
        let mut cache = self.cache.write().await;
        if let Some(img) = cache.get(&key.memory_key()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    async fn put(&self, key: &CacheKey, entry: &CacheEntry) {
        let mut cache = self.cache.write().await;
        debug!(key = %key, "Storing image in memory cache");
        cache.put(key.memory_key(), entry.image.clone());
    }
}
