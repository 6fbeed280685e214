//! LRU caches for parsed and compiled expressions
//!
//! Keyed by source text (the compile cache key also carries the options
//! that shaped compilation). `get` promotes, `put` evicts the least
//! recently used entry on overflow, `clear` empties. A mutex keeps the
//! caches consistent across concurrent evaluating threads; entries are
//! `Arc`-shared so hits never copy.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default capacity of the parse and compile caches
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Mutex-guarded LRU of `Arc`-shared values
pub struct ExpressionCache<V> {
    inner: Mutex<LruCache<String, Arc<V>>>,
}

impl<V> ExpressionCache<V> {
    /// Create a cache holding up to `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch and promote
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.inner.lock().get(key).cloned()
    }

    /// Insert, evicting the least recently used entry when full
    pub fn put(&self, key: String, value: Arc<V>) {
        self.inner.lock().put(key, value);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_order() {
        let cache: ExpressionCache<i32> = ExpressionCache::new(2);
        cache.put("a".into(), Arc::new(1));
        cache.put("b".into(), Arc::new(2));
        // Touch "a" so "b" is the eviction candidate
        assert_eq!(cache.get("a").as_deref(), Some(&1));
        cache.put("c".into(), Arc::new(3));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").as_deref(), Some(&1));
        assert_eq!(cache.get("c").as_deref(), Some(&3));
    }

    #[test]
    fn test_clear() {
        let cache: ExpressionCache<i32> = ExpressionCache::new(4);
        cache.put("a".into(), Arc::new(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
