//! Capacity- and time-bounded cache

use crate::cache::{BoundedCache, LruCache};
use chrono::{DateTime, Duration, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;

/// Value plus the instant it stops being served
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stamped<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// LRU cache whose entries also expire a fixed time after insertion
///
/// Expiry uses wall-clock time so that a persisted cache still ages
/// across process runs. The `*_at` methods take an explicit `now`.
pub struct TtlCache<K, V> {
    ttl_secs: i64,
    inner: LruCache<K, Stamped<V>>,
    // Insertion order doubles as expiry order because the ttl is fixed.
    // Entries whose key was since replaced or evicted are skipped lazily.
    timeline: VecDeque<(DateTime<Utc>, K)>,
}

impl<K: Eq + Hash + Clone, V> TtlCache<K, V> {
    /// Create an empty cache with the given capacity and time-to-live
    pub fn new(capacity: usize, ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            inner: LruCache::new(capacity),
            timeline: VecDeque::new(),
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Look up a live entry as of `now`, dropping it if it has expired
    pub fn get_at(&mut self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        let expired = match self.inner.peek(key) {
            Some(stamped) => now >= stamped.expires_at,
            None => return None,
        };
        if expired {
            self.inner.remove(key);
            return None;
        }
        self.inner.get(key).map(|stamped| &stamped.value)
    }

    /// Look up a live entry without changing its recency
    pub fn peek_at(&self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        self.inner
            .peek(key)
            .filter(|stamped| now < stamped.expires_at)
            .map(|stamped| &stamped.value)
    }

    pub fn contains_at(&self, key: &K, now: DateTime<Utc>) -> bool {
        self.peek_at(key, now).is_some()
    }

    /// Insert an entry that expires `ttl_secs` after `now`
    pub fn set_at(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.expire(now);
        let expires_at = expiry(now, self.ttl_secs);
        self.timeline.push_back((expires_at, key.clone()));
        self.inner.set(key, Stamped { value, expires_at });
        self.compact_timeline();
    }

    /// Drop every entry that has expired as of `now`
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        while let Some((expires_at, _)) = self.timeline.front() {
            if now < *expires_at {
                break;
            }
            let Some((expires_at, key)) = self.timeline.pop_front() else {
                break;
            };
            let current = self.inner.peek(&key).map(|stamped| stamped.expires_at);
            if current == Some(expires_at) {
                self.inner.remove(&key);
                expired += 1;
            }
        }
        expired
    }

    /// Live entries as of `now`, from least to most recently used
    pub fn iter_at(&self, now: DateTime<Utc>) -> impl Iterator<Item = (&K, &V)> {
        self.inner
            .iter()
            .filter(move |(_, stamped)| now < stamped.expires_at)
            .map(|(key, stamped)| (key, &stamped.value))
    }

    /// Live entries as of the current time
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter_at(Utc::now())
    }

    pub fn peek(&self, key: &K) -> Option<&V> {
        self.peek_at(key, Utc::now())
    }

    fn compact_timeline(&mut self) {
        if self.timeline.len() <= self.inner.capacity().saturating_mul(2) + 16 {
            return;
        }
        self.timeline = self.rebuild_timeline();
    }

    fn rebuild_timeline(&self) -> VecDeque<(DateTime<Utc>, K)> {
        let mut timeline: Vec<_> = self
            .inner
            .iter()
            .map(|(key, stamped)| (stamped.expires_at, key.clone()))
            .collect();
        timeline.sort_by_key(|(expires_at, _)| *expires_at);
        timeline.into()
    }
}

/// `now + ttl_secs`, saturating at the ends of the representable range
fn expiry(now: DateTime<Utc>, ttl_secs: i64) -> DateTime<Utc> {
    Duration::try_seconds(ttl_secs)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(if ttl_secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> for TtlCache<K, V> {
    fn get(&mut self, key: &K) -> Option<&V> {
        self.get_at(key, Utc::now())
    }

    fn set(&mut self, key: K, value: V) {
        self.set_at(key, value, Utc::now());
    }

    fn contains(&self, key: &K) -> bool {
        self.contains_at(key, Utc::now())
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|stamped| stamped.value)
    }

    fn evict_if_needed(&mut self) -> usize {
        self.expire(Utc::now()) + self.inner.evict_if_needed()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.timeline.clear();
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            ttl_secs: self.ttl_secs,
            inner: self.inner.clone(),
            timeline: self.timeline.clone(),
        }
    }
}

impl<K, V> fmt::Debug for TtlCache<K, V>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl_secs", &self.ttl_secs)
            .field("inner", &self.inner)
            .finish()
    }
}

#[derive(Serialize)]
struct TtlStateRef<'a, K: Eq + Hash + Clone, V> {
    ttl_secs: i64,
    entries: &'a LruCache<K, Stamped<V>>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "K: Deserialize<'de> + Eq + Hash + Clone, V: Deserialize<'de>"))]
struct TtlState<K: Eq + Hash + Clone, V> {
    ttl_secs: i64,
    entries: LruCache<K, Stamped<V>>,
}

impl<K, V> Serialize for TtlCache<K, V>
where
    K: Serialize + Eq + Hash + Clone,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TtlStateRef {
            ttl_secs: self.ttl_secs,
            entries: &self.inner,
        }
        .serialize(serializer)
    }
}

impl<'de, K, V> Deserialize<'de> for TtlCache<K, V>
where
    K: Deserialize<'de> + Eq + Hash + Clone,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = TtlState::<K, V>::deserialize(deserializer)?;
        let mut cache = TtlCache {
            ttl_secs: state.ttl_secs,
            inner: state.entries,
            timeline: VecDeque::new(),
        };
        cache.timeline = cache.rebuild_timeline();
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = TtlCache::new(10, 60);
        cache.set_at("build", 1, at(0));

        assert_eq!(cache.get_at(&"build", at(59)), Some(&1));
        assert_eq!(cache.get_at(&"build", at(60)), None);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn capacity_still_bounds_live_entries() {
        let mut cache = TtlCache::new(2, 3600);
        cache.set_at(1, "a", at(0));
        cache.set_at(2, "b", at(1));
        cache.set_at(3, "c", at(2));

        assert_eq!(cache.size(), 2);
        assert!(!cache.contains_at(&1, at(3)));
        assert!(cache.contains_at(&3, at(3)));
    }

    #[test]
    fn expire_skips_replaced_entries() {
        let mut cache = TtlCache::new(10, 60);
        cache.set_at("k", 1, at(0));
        cache.set_at("k", 2, at(30));

        assert_eq!(cache.expire(at(61)), 0);
        assert_eq!(cache.peek_at(&"k", at(61)), Some(&2));
        assert_eq!(cache.expire(at(90)), 1);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn iter_hides_expired_entries() {
        let mut cache = TtlCache::new(10, 60);
        cache.set_at(1, "old", at(0));
        cache.set_at(2, "new", at(50));

        let live: Vec<_> = cache.iter_at(at(70)).map(|(k, _)| *k).collect();
        assert_eq!(live, vec![2]);
    }

    #[test]
    fn zero_ttl_never_serves() {
        let mut cache = TtlCache::new(10, 0);
        cache.set_at("k", 1, at(0));
        assert_eq!(cache.get_at(&"k", at(0)), None);
    }

    #[test]
    fn timeline_stays_bounded_under_rewrites() {
        let mut cache = TtlCache::new(2, 3600);
        for i in 0..100 {
            cache.set_at("same", i, at(i));
        }
        assert!(cache.timeline.len() <= 2 * 2 + 16 + 1);
        assert_eq!(cache.peek_at(&"same", at(100)), Some(&99));
    }

    #[test]
    fn serde_keeps_ttl_and_expiry() {
        let mut cache = TtlCache::new(5, 60);
        cache.set_at(7_i64, "seven".to_string(), at(0));

        let json = serde_json::to_string(&cache).unwrap();
        let mut restored: TtlCache<i64, String> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.ttl_secs(), 60);
        assert_eq!(restored.capacity(), 5);
        assert_eq!(restored.peek_at(&7, at(10)), Some(&"seven".to_string()));
        assert_eq!(restored.expire(at(60)), 1);
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let mut cache = TtlCache::new(4, i64::MAX);
        cache.set_at("build", 1, at(0));
        assert_eq!(cache.get_at(&"build", at(10 * 365 * 86_400)), Some(&1));

        let mut cache = TtlCache::new(4, i64::MIN);
        cache.set_at("build", 1, at(0));
        assert_eq!(cache.get_at(&"build", at(0)), None);
    }
}
