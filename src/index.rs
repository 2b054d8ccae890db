//! The six cross-referenced build caches
//!
//! Build records and task results are the primary data. The four identity
//! indices (parent, task, NVR to id, id to NVR) are derived from them and
//! can be rebuilt at any time by [`IndexSet::cross_populate`].

use crate::cache::{
    BoundedCache, CacheStore, LruCache, TtlCache, DEFAULT_BUILD_DATA_CAPACITY,
    DEFAULT_INDEX_CAPACITY, DEFAULT_TASK_RESULTS_CAPACITY, DEFAULT_TTL_SECS,
};
use crate::error::{LineageError, LineageResult};
use crate::types::{BuildId, BuildRecord, BuildSummary, Nvr, TaskId, TaskResult};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Stable file names of the persisted caches
pub mod names {
    pub const BUILD_DATA: &str = "build_data";
    pub const TASK_RESULTS: &str = "task_results";
    pub const BUILD_ID_TO_PARENT_ID: &str = "build_id_to_parent_id";
    pub const BUILD_ID_TO_BUILD_TASK_ID: &str = "build_id_to_build_task_id";
    pub const NVR_TO_BUILD_ID: &str = "nvr_to_build_id";
    pub const BUILD_ID_TO_NVR: &str = "build_id_to_nvr";

    /// Every persisted cache, in save order
    pub const ALL: [&str; 6] = [
        BUILD_ID_TO_PARENT_ID,
        BUILD_ID_TO_BUILD_TASK_ID,
        BUILD_DATA,
        TASK_RESULTS,
        NVR_TO_BUILD_ID,
        BUILD_ID_TO_NVR,
    ];
}

/// Capacities and time-to-live for a fresh [`IndexSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    pub build_data_capacity: usize,
    pub task_results_capacity: usize,
    pub index_capacity: usize,
    pub ttl_secs: i64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            build_data_capacity: DEFAULT_BUILD_DATA_CAPACITY,
            task_results_capacity: DEFAULT_TASK_RESULTS_CAPACITY,
            index_capacity: DEFAULT_INDEX_CAPACITY,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

/// Occupancy of one named cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub name: &'static str,
    pub entries: usize,
    pub capacity: usize,
}

/// Build records, task results and the identity indices derived from them
///
/// In the parent index an absent key means "never resolved" while a
/// `None` value means "resolved, has no parent".
#[derive(Debug, Clone)]
pub struct IndexSet {
    build_data: TtlCache<BuildId, BuildRecord>,
    task_results: TtlCache<TaskId, TaskResult>,
    build_id_to_parent_id: LruCache<BuildId, Option<BuildId>>,
    build_id_to_build_task_id: LruCache<BuildId, TaskId>,
    nvr_to_build_id: LruCache<Nvr, BuildId>,
    build_id_to_nvr: LruCache<BuildId, Nvr>,
}

impl IndexSet {
    /// Create an empty set of caches
    pub fn new(settings: IndexSettings) -> Self {
        Self {
            build_data: TtlCache::new(settings.build_data_capacity, settings.ttl_secs),
            task_results: TtlCache::new(settings.task_results_capacity, settings.ttl_secs),
            build_id_to_parent_id: LruCache::new(settings.index_capacity),
            build_id_to_build_task_id: LruCache::new(settings.index_capacity),
            nvr_to_build_id: LruCache::new(settings.index_capacity),
            build_id_to_nvr: LruCache::new(settings.index_capacity),
        }
    }

    /// Live build record for `id`, if cached and not expired
    pub fn build_record(&mut self, id: BuildId) -> Option<BuildRecord> {
        self.build_data.get(&id).cloned()
    }

    /// Live task result for `id`, if cached and not expired
    pub fn task_result(&mut self, id: TaskId) -> Option<TaskResult> {
        self.task_results.get(&id).cloned()
    }

    /// Parent index lookup
    ///
    /// `None` means unresolved; `Some(None)` means resolved with no parent.
    pub fn parent_of(&mut self, id: BuildId) -> Option<Option<BuildId>> {
        self.build_id_to_parent_id.get(&id).copied()
    }

    pub fn task_id_of(&mut self, id: BuildId) -> Option<TaskId> {
        self.build_id_to_build_task_id.get(&id).copied()
    }

    pub fn build_id_for(&mut self, nvr: &Nvr) -> Option<BuildId> {
        self.nvr_to_build_id.get(nvr).copied()
    }

    pub fn nvr_of(&mut self, id: BuildId) -> Option<Nvr> {
        self.build_id_to_nvr.get(&id).cloned()
    }

    /// Whether `id` keys a live build record or an NVR entry
    pub fn knows_build(&self, id: BuildId) -> bool {
        self.build_data.contains(&id) || self.build_id_to_nvr.contains(&id)
    }

    /// Store a freshly fetched build record and refresh every index from it
    ///
    /// All four indices are rewritten in one step so no lookup can observe
    /// the record without its identity, parent and task entries.
    pub fn absorb_build(&mut self, record: BuildRecord) {
        self.refresh_from(&record);
        self.build_data.set(record.build_id, record);
    }

    /// Rewrite the four identity indices from a record
    ///
    /// The record itself is left alone, so its time-to-live keeps running.
    pub fn refresh_from(&mut self, record: &BuildRecord) {
        let id = record.build_id;

        // Drop mappings that would no longer be invertible.
        if let Some(old_nvr) = self.build_id_to_nvr.peek(&id).cloned() {
            if old_nvr != record.nvr && self.nvr_to_build_id.peek(&old_nvr) == Some(&id) {
                self.nvr_to_build_id.remove(&old_nvr);
            }
        }
        if let Some(old_id) = self.nvr_to_build_id.peek(&record.nvr).copied() {
            if old_id != id && self.build_id_to_nvr.peek(&old_id) == Some(&record.nvr) {
                self.build_id_to_nvr.remove(&old_id);
            }
        }

        self.nvr_to_build_id.set(record.nvr.clone(), id);
        self.build_id_to_nvr.set(id, record.nvr.clone());
        self.build_id_to_parent_id.set(id, record.parent_build_id);
        if let Some(task_id) = record.build_task_id {
            self.build_id_to_build_task_id.set(id, task_id);
        }
    }

    /// Store a freshly fetched task result
    ///
    /// Builds the task produced become discoverable through the task index
    /// before their own records are ever fetched.
    pub fn absorb_task(&mut self, result: TaskResult) {
        if result.is_container_task() {
            for build_id in result.koji_builds.iter().flatten() {
                if !self.build_id_to_build_task_id.contains(build_id) {
                    self.build_id_to_build_task_id.set(*build_id, result.task_id);
                }
            }
        }
        self.task_results.set(result.task_id, result);
    }

    /// Record the identity pair from a tag listing
    pub fn absorb_listing(&mut self, summary: &BuildSummary) {
        if !self.nvr_to_build_id.contains(&summary.nvr) {
            self.nvr_to_build_id.set(summary.nvr.clone(), summary.build_id);
        }
        self.build_id_to_nvr.set(summary.build_id, summary.nvr.clone());
    }

    /// Re-derive the identity indices from resident records and results
    ///
    /// Only fills gaps: entries already present are never overwritten.
    /// Running it twice in a row changes nothing the second time. Returns
    /// the number of entries written.
    pub fn cross_populate(&mut self) -> usize {
        let now = Utc::now();
        let mut filled = 0;

        let records: Vec<(BuildId, Nvr, Option<BuildId>, Option<TaskId>)> = self
            .build_data
            .iter_at(now)
            .map(|(id, r)| (*id, r.nvr.clone(), r.parent_build_id, r.build_task_id))
            .collect();

        for (id, nvr, parent, task) in records {
            filled += fill(&mut self.nvr_to_build_id, nvr.clone(), id);
            filled += fill(&mut self.build_id_to_nvr, id, nvr);
            filled += fill(&mut self.build_id_to_parent_id, id, parent);
            if let Some(task) = task {
                filled += fill(&mut self.build_id_to_build_task_id, id, task);
            }
        }

        let produced: Vec<(BuildId, TaskId)> = self
            .task_results
            .iter_at(now)
            .filter(|(_, t)| t.is_container_task())
            .flat_map(|(task_id, t)| {
                t.koji_builds
                    .iter()
                    .flatten()
                    .map(move |build_id| (*build_id, *task_id))
            })
            .collect();

        for (build_id, task_id) in produced {
            filled += fill(&mut self.build_id_to_build_task_id, build_id, task_id);
        }

        let forward: Vec<(Nvr, BuildId)> = self
            .nvr_to_build_id
            .iter()
            .map(|(nvr, id)| (nvr.clone(), *id))
            .collect();
        for (nvr, id) in forward {
            filled += fill(&mut self.build_id_to_nvr, id, nvr);
        }

        let reverse: Vec<(BuildId, Nvr)> = self
            .build_id_to_nvr
            .iter()
            .map(|(id, nvr)| (*id, nvr.clone()))
            .collect();
        for (id, nvr) in reverse {
            filled += fill(&mut self.nvr_to_build_id, nvr, id);
        }

        if filled > 0 {
            debug!("Cross-populated {} index entries", filled);
        }
        filled
    }

    /// Replace caches with their persisted versions, then cross-populate
    ///
    /// A missing file keeps the empty cache. A corrupt file is logged and
    /// also keeps the empty cache; loading never fails as a whole. Returns
    /// how many caches were restored.
    pub async fn load(&mut self, store: &CacheStore) -> usize {
        use names::*;

        let restored = restore(store, BUILD_ID_TO_PARENT_ID, &mut self.build_id_to_parent_id)
            .await
            + restore(store, NVR_TO_BUILD_ID, &mut self.nvr_to_build_id).await
            + restore(store, BUILD_ID_TO_BUILD_TASK_ID, &mut self.build_id_to_build_task_id)
                .await
            + restore(store, BUILD_DATA, &mut self.build_data).await
            + restore(store, TASK_RESULTS, &mut self.task_results).await
            + restore(store, BUILD_ID_TO_NVR, &mut self.build_id_to_nvr).await;

        for stats in self.stats() {
            debug!("Loaded {} entries into {}", stats.entries, stats.name);
        }

        self.cross_populate();
        restored
    }

    /// Persist every cache, stopping at the first write failure
    pub async fn save(&self, store: &CacheStore) -> LineageResult<()> {
        store.save(names::BUILD_ID_TO_PARENT_ID, &self.build_id_to_parent_id).await?;
        store
            .save(names::BUILD_ID_TO_BUILD_TASK_ID, &self.build_id_to_build_task_id)
            .await?;
        store.save(names::BUILD_DATA, &self.build_data).await?;
        store.save(names::TASK_RESULTS, &self.task_results).await?;
        store.save(names::NVR_TO_BUILD_ID, &self.nvr_to_build_id).await?;
        store.save(names::BUILD_ID_TO_NVR, &self.build_id_to_nvr).await?;

        for stats in self.stats() {
            debug!("Saved {} entries from {}", stats.entries, stats.name);
        }
        Ok(())
    }

    /// Occupancy of every cache
    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            stats(names::BUILD_DATA, &self.build_data),
            stats(names::TASK_RESULTS, &self.task_results),
            stats(names::BUILD_ID_TO_PARENT_ID, &self.build_id_to_parent_id),
            stats(names::BUILD_ID_TO_BUILD_TASK_ID, &self.build_id_to_build_task_id),
            stats(names::NVR_TO_BUILD_ID, &self.nvr_to_build_id),
            stats(names::BUILD_ID_TO_NVR, &self.build_id_to_nvr),
        ]
    }
}

impl Default for IndexSet {
    fn default() -> Self {
        Self::new(IndexSettings::default())
    }
}

// Fills only into free capacity: evicting an entry filled earlier in the
// same pass would make every later pass refill it.
fn fill<K, V>(cache: &mut LruCache<K, V>, key: K, value: V) -> usize
where
    K: Eq + std::hash::Hash,
{
    if cache.contains(&key) || cache.is_full() {
        return 0;
    }
    cache.set(key, value);
    1
}

fn stats<K, V>(name: &'static str, cache: &impl BoundedCache<K, V>) -> CacheStats {
    CacheStats {
        name,
        entries: cache.size(),
        capacity: cache.capacity(),
    }
}

async fn restore<C: DeserializeOwned>(store: &CacheStore, name: &str, slot: &mut C) -> usize {
    match store.load::<C>(name).await {
        Ok(Some(cache)) => {
            *slot = cache;
            1
        }
        Ok(None) => 0,
        Err(e @ LineageError::CacheLoad { .. }) => {
            warn!("{}; starting with an empty cache", e);
            0
        }
        Err(e) => {
            warn!("Unexpected error loading cache {}: {}", name, e);
            0
        }
    }
}
