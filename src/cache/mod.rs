//! Bounded in-memory caches and their on-disk persistence
//!
//! Two eviction strategies sit behind one interface:
//!
//! | Cache | Bound | Used for |
//! |-------|-------|----------|
//! | [`LruCache`] | capacity, least-recently-used first | identity indices |
//! | [`TtlCache`] | capacity and time-to-live | build data, task results |
//!
//! Eviction only ever removes entries. It never calls out to the build
//! system and never cascades into other caches.

pub mod lru;
pub mod store;
pub mod ttl;

pub use lru::LruCache;
pub use store::CacheStore;
pub use ttl::TtlCache;

/// Default time-to-live for fetched build metadata (7 days)
pub const DEFAULT_TTL_SECS: i64 = 604_800;

/// Longest time-to-live accepted from configuration (10 years)
pub const MAX_TTL_SECS: i64 = 315_360_000;

/// Default capacity of the build data cache
pub const DEFAULT_BUILD_DATA_CAPACITY: usize = 6_000;

/// Default capacity of the task result cache
pub const DEFAULT_TASK_RESULTS_CAPACITY: usize = 8_000;

/// Default capacity of each identity index
pub const DEFAULT_INDEX_CAPACITY: usize = 16_000;

/// A key/value container bounded by size and possibly by age
pub trait BoundedCache<K, V> {
    /// Look up a live entry, marking it most recently used
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Insert or replace an entry, evicting as needed to stay in bounds
    fn set(&mut self, key: K, value: V);

    /// Whether a live entry exists, without touching recency
    fn contains(&self, key: &K) -> bool;

    /// Remove an entry, returning its value
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Drop expired and over-capacity entries; returns how many were dropped
    fn evict_if_needed(&mut self) -> usize;

    /// Number of resident entries
    fn size(&self) -> usize;

    /// Maximum number of resident entries
    fn capacity(&self) -> usize;

    /// Remove every entry
    fn clear(&mut self);
}
