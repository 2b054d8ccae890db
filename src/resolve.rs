//! Read-through build resolution
//!
//! Every query first consults the [`IndexSet`]; on a miss it makes one
//! call to the build metadata service and writes the answer back through
//! the indices before returning. Remote failures are never retried here.
//!
//! The index set sits behind a single mutex held for the whole
//! read-miss-fetch-populate sequence of a query, so concurrent callers see
//! either a clean miss or a fully populated entry.

use crate::cache::CacheStore;
use crate::error::{LineageError, LineageResult};
use crate::index::{CacheStats, IndexSet};
use crate::service::BuildMetadataService;
use crate::types::{
    BuildId, BuildRecord, ContainerRecord, Identifier, Nvr, TagQuery, TaskId, TaskResult,
};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Container builds of a tag grouped by package, then by build id
pub type ContainersByPackage = BTreeMap<String, BTreeMap<BuildId, ContainerRecord>>;

/// Public query API over the cached indices
pub struct ResolutionService {
    indices: Mutex<IndexSet>,
    service: Box<dyn BuildMetadataService>,
}

impl ResolutionService {
    /// Wrap a build metadata service with the given caches
    pub fn new(service: Box<dyn BuildMetadataService>, indices: IndexSet) -> Self {
        Self {
            indices: Mutex::new(indices),
            service,
        }
    }

    /// Name of the underlying build metadata source
    pub fn source_name(&self) -> &str {
        self.service.source_name()
    }

    /// Persist the caches
    pub async fn save(&self, store: &CacheStore) -> LineageResult<()> {
        self.indices.lock().await.save(store).await
    }

    /// Occupancy of every cache
    pub async fn stats(&self) -> Vec<CacheStats> {
        self.indices.lock().await.stats()
    }

    /// Give back the caches, e.g. to save them after the last query
    pub fn into_indices(self) -> IndexSet {
        self.indices.into_inner()
    }

    /// Resolve an id or NVR to a build id
    ///
    /// A numeric id already known to the caches is trusted as-is. Anything
    /// else that misses is fetched, which also populates every index.
    pub async fn resolve_build_id(&self, ident: &Identifier) -> LineageResult<BuildId> {
        let mut indices = self.indices.lock().await;
        self.resolve_locked(&mut indices, ident).await
    }

    /// Build record for an id or NVR, fetched if absent or expired
    pub async fn get_build_record(&self, ident: &Identifier) -> LineageResult<BuildRecord> {
        let mut indices = self.indices.lock().await;
        self.record_locked(&mut indices, ident).await
    }

    /// Parent of a build, `None` for a base image
    pub async fn get_parent_build_id(&self, ident: &Identifier) -> LineageResult<Option<BuildId>> {
        let mut indices = self.indices.lock().await;
        self.parent_locked(&mut indices, ident).await
    }

    /// Result of a task, tolerating faults
    ///
    /// A failed task yields an error-shaped [`TaskResult`] rather than an
    /// error, and that result is cached like any other.
    pub async fn get_task_result(&self, task_id: TaskId) -> LineageResult<TaskResult> {
        let mut indices = self.indices.lock().await;
        self.task_locked(&mut indices, task_id, true).await
    }

    /// Result of a task; without `tolerate_fault` a failed task is an error
    pub async fn get_task_result_with(
        &self,
        task_id: TaskId,
        tolerate_fault: bool,
    ) -> LineageResult<TaskResult> {
        let mut indices = self.indices.lock().await;
        self.task_locked(&mut indices, task_id, tolerate_fault).await
    }

    pub async fn get_nvr(&self, ident: &Identifier) -> LineageResult<Nvr> {
        let mut indices = self.indices.lock().await;
        let id = self.resolve_locked(&mut indices, ident).await?;
        if let Some(nvr) = indices.nvr_of(id) {
            return Ok(nvr);
        }
        Ok(self.record_locked(&mut indices, &id.into()).await?.nvr)
    }

    pub async fn get_package_name(&self, ident: &Identifier) -> LineageResult<String> {
        let mut indices = self.indices.lock().await;
        Ok(self.record_locked(&mut indices, ident).await?.package_name)
    }

    /// Task that produced a build, if it was built by one
    pub async fn get_build_task_id(&self, ident: &Identifier) -> LineageResult<Option<TaskId>> {
        let mut indices = self.indices.lock().await;
        self.build_task_locked(&mut indices, ident).await
    }

    /// Build joined with its parent and, optionally, its task's pullspecs
    pub async fn get_container_record(
        &self,
        ident: &Identifier,
        with_task_info: bool,
    ) -> LineageResult<ContainerRecord> {
        let mut indices = self.indices.lock().await;
        self.container_locked(&mut indices, ident, with_task_info).await
    }

    /// NVRs of the container builds carrying `tag`
    ///
    /// The listing seeds the NVR indices so later lookups of these builds
    /// resolve without a fetch.
    pub async fn list_tag_containers(
        &self,
        tag: &str,
        query: &TagQuery,
    ) -> LineageResult<BTreeSet<Nvr>> {
        let mut indices = self.indices.lock().await;
        let builds = self.service.list_builds_for_tag(tag, query).await?;

        let mut containers = BTreeSet::new();
        for build in builds.iter().filter(|b| b.package_name.contains("container")) {
            indices.absorb_listing(build);
            containers.insert(build.nvr.clone());
        }

        info!("Found {} container builds in {}", containers.len(), tag);
        Ok(containers)
    }

    /// Every build of `tag` as a container record, grouped by package
    ///
    /// The listing seeds NVR lookups before each record is resolved, so
    /// builds already cached cost no fetch.
    pub async fn tag_containers(
        &self,
        tag: &str,
        query: &TagQuery,
        with_task_info: bool,
    ) -> LineageResult<ContainersByPackage> {
        let mut indices = self.indices.lock().await;
        let builds = self.service.list_builds_for_tag(tag, query).await?;

        let mut containers = ContainersByPackage::new();
        for build in &builds {
            indices.absorb_listing(build);
            let record = self
                .container_locked(&mut indices, &build.build_id.into(), with_task_info)
                .await?;
            containers
                .entry(build.package_name.clone())
                .or_default()
                .insert(build.build_id, record);
        }

        info!("Resolved {} builds of {}", builds.len(), tag);
        Ok(containers)
    }

    /// Container builds of `tag` whose task pushed a pullspec mentioning `batch`
    pub async fn matching_batch(
        &self,
        tag: &str,
        query: &TagQuery,
        batch: &str,
    ) -> LineageResult<ContainersByPackage> {
        let mut indices = self.indices.lock().await;
        let builds = self.service.list_builds_for_tag(tag, query).await?;

        let mut matching = ContainersByPackage::new();
        for build in builds.iter().filter(|b| b.package_name.contains("-container")) {
            indices.absorb_listing(build);
            let record = self
                .container_locked(&mut indices, &build.build_id.into(), true)
                .await?;

            let in_batch = record
                .task_pullspecs
                .iter()
                .flatten()
                .any(|pullspec| pullspec.contains(batch));
            if !in_batch {
                continue;
            }

            matching
                .entry(record.package_name.clone())
                .or_default()
                .insert(record.build_id, record);
        }

        info!("{} packages in {} match batch {}", matching.len(), tag, batch);
        Ok(matching)
    }

    async fn fetch_locked(
        &self,
        indices: &mut IndexSet,
        ident: &Identifier,
    ) -> LineageResult<BuildRecord> {
        debug!("Fetching build {} from {}", ident, self.source_name());
        let payload = self.service.get_build(ident).await?;
        let record = BuildRecord::try_from(payload)?;
        indices.absorb_build(record.clone());
        Ok(record)
    }

    async fn resolve_locked(
        &self,
        indices: &mut IndexSet,
        ident: &Identifier,
    ) -> LineageResult<BuildId> {
        match ident {
            Identifier::BuildId(id) if indices.knows_build(*id) => return Ok(*id),
            Identifier::Nvr(nvr) => {
                if let Some(id) = indices.build_id_for(nvr) {
                    return Ok(id);
                }
            }
            Identifier::BuildId(_) => {}
        }
        Ok(self.fetch_locked(indices, ident).await?.build_id)
    }

    async fn record_locked(
        &self,
        indices: &mut IndexSet,
        ident: &Identifier,
    ) -> LineageResult<BuildRecord> {
        let id = match ident {
            Identifier::BuildId(id) => *id,
            Identifier::Nvr(nvr) => match indices.build_id_for(nvr) {
                Some(id) => id,
                None => return self.fetch_locked(indices, ident).await,
            },
        };

        match indices.build_record(id) {
            Some(record) => {
                indices.refresh_from(&record);
                Ok(record)
            }
            None => self.fetch_locked(indices, &id.into()).await,
        }
    }

    async fn parent_locked(
        &self,
        indices: &mut IndexSet,
        ident: &Identifier,
    ) -> LineageResult<Option<BuildId>> {
        let id = self.resolve_locked(indices, ident).await?;
        if let Some(parent) = indices.parent_of(id) {
            return Ok(parent);
        }

        let record = self.record_locked(indices, &id.into()).await?;
        Ok(indices.parent_of(id).unwrap_or(record.parent_build_id))
    }

    async fn build_task_locked(
        &self,
        indices: &mut IndexSet,
        ident: &Identifier,
    ) -> LineageResult<Option<TaskId>> {
        let id = self.resolve_locked(indices, ident).await?;
        if let Some(task_id) = indices.task_id_of(id) {
            return Ok(Some(task_id));
        }
        Ok(self.record_locked(indices, &id.into()).await?.build_task_id)
    }

    async fn task_locked(
        &self,
        indices: &mut IndexSet,
        task_id: TaskId,
        tolerate_fault: bool,
    ) -> LineageResult<TaskResult> {
        let result = match indices.task_result(task_id) {
            Some(result) => result,
            None => {
                debug!("Fetching task {} from {}", task_id, self.source_name());
                let payload = self
                    .service
                    .get_task_result(task_id, tolerate_fault)
                    .await?;
                let result = TaskResult::from_payload(task_id, payload)?;
                indices.absorb_task(result.clone());
                result
            }
        };

        match &result.fault {
            Some(fault) if !tolerate_fault => Err(LineageError::TaskResultUnavailable {
                task_id: task_id.0,
                reason: fault.message.clone(),
            }),
            _ => Ok(result),
        }
    }

    async fn container_locked(
        &self,
        indices: &mut IndexSet,
        ident: &Identifier,
        with_task_info: bool,
    ) -> LineageResult<ContainerRecord> {
        let record = self.record_locked(indices, ident).await?;
        let parent_build_id = self.parent_locked(indices, &record.build_id.into()).await?;

        let mut task_pullspecs = None;
        if with_task_info {
            let task_id = self
                .build_task_locked(indices, &record.build_id.into())
                .await?;
            if let Some(task_id) = task_id {
                task_pullspecs = self
                    .task_locked(indices, task_id, true)
                    .await?
                    .repositories;
            }
        }

        Ok(ContainerRecord {
            package_name: record.package_name,
            nvr: record.nvr,
            build_id: record.build_id,
            build_pullspecs: record.pullspecs,
            build_tags: record.tags,
            parent_build_id,
            task_pullspecs,
        })
    }
}
