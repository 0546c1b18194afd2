//! HashMap-based memo table.
//!
//! Wraps `std::collections::HashMap` and counts lookups. There are no collisions and no
//! evictions: once a key is inserted, every later lookup of that key is a hit. Both traversal
//! contexts rely on this to guarantee that each node is processed at most once.

use std::collections::HashMap;
use std::hash::Hash;

/// A memo table backed by [HashMap].
pub struct HashMapCache<K, V> {
    map: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> HashMapCache<K, V> {
    /// Creates a new cache with room for `2^bits` entries.
    ///
    /// The map grows on demand, `bits` is only a sizing hint.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");
        Self::with_capacity(1 << bits)
    }

    /// Creates a new cache with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<K, V> HashMapCache<K, V>
where
    K: Hash + Eq,
    V: Copy,
{
    /// Looks up a key in the cache.
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.map.get(key) {
            Some(&v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Looks up a key without touching the counters.
    #[inline]
    pub fn peek(&self, key: &K) -> Option<V> {
        self.map.get(key).copied()
    }

    /// Inserts a key-value pair into the cache.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}
