//! Memoization cache for joined class-name strings.
//!
//! Rendering calls `cn` with the same fragment combinations over and over;
//! the cache stores the joined result keyed by the ordered list of non-empty
//! fragments so repeat calls skip the join.
//!
//! # Eviction
//! Entries are evicted in insertion order (FIFO). Reading an entry does not
//! refresh its position, so a hot entry is evicted as readily as a cold one.

use crate::config::MAX_CACHE_SIZE;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// Separates fragments inside a cache key. Cannot appear in a class name.
const KEY_DELIMITER: char = '\u{1f}';

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct ClassNameCache {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
    capacity: usize,
    stats: CacheStats,
}

impl Default for ClassNameCache {
    fn default() -> Self {
        Self::with_capacity(MAX_CACHE_SIZE)
    }
}

impl ClassNameCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(MAX_CACHE_SIZE)),
            order: VecDeque::with_capacity(capacity.min(MAX_CACHE_SIZE)),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Join the non-empty fragments with single spaces and trim the result.
    ///
    /// `None` and `""` are skipped. The lookup key is order-sensitive, so
    /// `["a", "b"]` and `["b", "a"]` occupy separate entries.
    pub fn compute(&mut self, fragments: &[Option<&str>]) -> String {
        let parts: Vec<&str> = fragments
            .iter()
            .filter_map(|f| f.filter(|s| !s.is_empty()))
            .collect();

        let key = parts.join(&KEY_DELIMITER.to_string());
        if let Some(hit) = self.entries.get(&key) {
            self.stats.hits += 1;
            return hit.clone();
        }

        self.stats.misses += 1;
        let value = parts.join(" ").trim().to_string();
        self.insert(key, value.clone());
        value
    }

    fn insert(&mut self, key: String, value: String) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Whether the exact fragment sequence currently has a cached entry.
    pub fn contains(&self, fragments: &[&str]) -> bool {
        let key = fragments
            .iter()
            .copied()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(&KEY_DELIMITER.to_string());
        self.entries.contains_key(&key)
    }
}

thread_local! {
    /// Shared cache used by `cn` and `ClassNameBuilder::build`.
    /// Thread-local because the UI runs on a single thread.
    pub static CLASS_NAME_CACHE: RefCell<ClassNameCache> =
        RefCell::new(ClassNameCache::default());
}

/// Run `f` against the shared class-name cache.
pub fn with_class_cache<R>(f: impl FnOnce(&mut ClassNameCache) -> R) -> R {
    CLASS_NAME_CACHE.with(|c| f(&mut c.borrow_mut()))
}

/// Empty the shared class-name cache.
pub fn clear_class_cache() {
    with_class_cache(ClassNameCache::clear);
}

/// Replace the shared cache with an empty one of the given capacity.
pub fn configure_class_cache(capacity: usize) {
    with_class_cache(|cache| *cache = ClassNameCache::with_capacity(capacity));
}
