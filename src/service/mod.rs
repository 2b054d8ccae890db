//! Build metadata service abstraction
//!
//! The caches sit in front of a build system that answers three kinds of
//! questions: what is this build, what did this task produce, and which
//! builds carry this tag. Implementations own their transport and any
//! retry policy; the cache layer calls each method at most once per miss.

mod snapshot;
#[cfg(test)]
pub(crate) mod testing;

pub use snapshot::{Snapshot, SnapshotService, TagEntry};

use crate::error::LineageResult;
use crate::types::{BuildPayload, BuildSummary, Identifier, TagQuery, TaskId, TaskPayload};
use async_trait::async_trait;

/// Abstract build metadata source
#[async_trait]
pub trait BuildMetadataService: Send + Sync {
    /// Fetch one build by id or NVR
    ///
    /// Fails with `BuildNotFound` when the build system does not know it.
    async fn get_build(&self, ident: &Identifier) -> LineageResult<BuildPayload>;

    /// Fetch the result of a task
    ///
    /// With `tolerate_fault` a failed task is returned as an error-shaped
    /// payload; without it the failure is `TaskResultUnavailable`.
    async fn get_task_result(
        &self,
        task_id: TaskId,
        tolerate_fault: bool,
    ) -> LineageResult<TaskPayload>;

    /// List the builds carrying `tag`
    async fn list_builds_for_tag(
        &self,
        tag: &str,
        query: &TagQuery,
    ) -> LineageResult<Vec<BuildSummary>>;

    /// Human-readable name of the source for display
    fn source_name(&self) -> &str;
}
