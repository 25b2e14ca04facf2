use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe LRU cache of text embeddings
///
/// The raw query string is re-encoded for every style pair of the similarity
/// experiment; this keeps those repeats off the embedding backend. Generated
/// hypothesis documents are sampled fresh and almost never hit.
pub struct EmbeddingCache {
    cache: Mutex<LruCache<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Hit/miss counters, reported at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl EmbeddingCache {
    /// Create a new embedding cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Vec<f32>>> {
        // A panic while holding the lock cannot leave the LRU half-updated
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up the embedding for `text`, marking it most recently used
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let found = self.lock().get(text).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store an embedding, evicting the least recently used entry when full
    pub fn put(&self, text: String, embedding: Vec<f32>) {
        self.lock().put(text, embedding);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_put_and_get() {
        let cache = EmbeddingCache::new(10);
        let embedding = vec![1.0, 2.0, 3.0];

        cache.put("how long to boil an egg".to_string(), embedding.clone());

        assert_eq!(cache.get("how long to boil an egg"), Some(embedding));
        assert!(cache.get("how long to poach an egg").is_none());
    }

    #[test]
    fn test_cache_get_updates_lru() {
        let cache = EmbeddingCache::new(2);

        cache.put("q1".to_string(), vec![1.0]);
        cache.put("q2".to_string(), vec![2.0]);

        // Touch q1 so q2 becomes the eviction candidate
        let _ = cache.get("q1");
        cache.put("q3".to_string(), vec![3.0]);

        assert!(cache.get("q1").is_some());
        assert!(cache.get("q2").is_none());
        assert!(cache.get("q3").is_some());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = EmbeddingCache::new(0);
        cache.put("a".to_string(), vec![1.0]);
        cache.put("b".to_string(), vec![2.0]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_stats_and_clear() {
        let cache = EmbeddingCache::new(4);
        cache.put("a".to_string(), vec![1.0]);
        let _ = cache.get("a");
        let _ = cache.get("a");
        let _ = cache.get("z");

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                entries: 1
            }
        );
        assert!(!cache.is_empty());
    }
}
