//! Capacity-bounded least-recently-used cache

use crate::cache::BoundedCache;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Cache that evicts the least recently used entry once full
///
/// Backed by [`lru::LruCache`], so lookups, inserts and evictions are O(1).
/// A capacity of zero is raised to one.
pub struct LruCache<K, V> {
    inner: lru::LruCache<K, V>,
}

impl<K: Eq + Hash, V> LruCache<K, V> {
    /// Create an empty cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: lru::LruCache::new(capacity),
        }
    }

    /// Look up an entry without changing its recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.inner.peek(key)
    }

    /// Remove and return the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        self.inner.pop_lru()
    }

    /// Entries from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter().rev()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Whether another distinct key would evict an entry
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.inner.cap().get()
    }
}

impl<K: Eq + Hash, V> BoundedCache<K, V> for LruCache<K, V> {
    fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    fn set(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    fn evict_if_needed(&mut self) -> usize {
        let mut evicted = 0;
        while self.inner.len() > self.inner.cap().get() && self.inner.pop_lru().is_some() {
            evicted += 1;
        }
        evicted
    }

    fn size(&self) -> usize {
        self.inner.len()
    }

    fn capacity(&self) -> usize {
        self.inner.cap().get()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Clone for LruCache<K, V> {
    fn clone(&self) -> Self {
        let mut copy = LruCache::new(self.capacity());
        for (key, value) in self.iter() {
            copy.set(key.clone(), value.clone());
        }
        copy
    }
}

impl<K, V> fmt::Debug for LruCache<K, V>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity())
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Serialize)]
struct LruStateRef<'a, K, V> {
    capacity: usize,
    entries: Vec<(&'a K, &'a V)>,
}

#[derive(Deserialize)]
struct LruState<K, V> {
    capacity: usize,
    entries: Vec<(K, V)>,
}

// Persisted as capacity plus entries in recency order, so a reload keeps
// both the bound and which entries are next in line for eviction.
impl<K, V> Serialize for LruCache<K, V>
where
    K: Serialize + Eq + Hash,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LruStateRef {
            capacity: self.capacity(),
            entries: self.iter().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de, K, V> Deserialize<'de> for LruCache<K, V>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = LruState::<K, V>::deserialize(deserializer)?;
        let mut cache = LruCache::new(state.capacity);
        for (key, value) in state.entries {
            cache.set(key, value);
        }
        Ok(cache)
    }
}
