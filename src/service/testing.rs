//! Test doubles for the build metadata service

use crate::error::LineageResult;
use crate::service::{BuildMetadataService, Snapshot, SnapshotService};
use crate::types::{
    BuildExtra, BuildId, BuildPayload, BuildSummary, Identifier, ImageExtra, ImageIndex, LooseId,
    Nvr, TagQuery, TaskId, TaskPayload,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Call counters shared between a [`CountingService`] and the test
#[derive(Debug, Default)]
pub struct Calls {
    pub builds: AtomicUsize,
    pub tasks: AtomicUsize,
    pub tags: AtomicUsize,
}

impl Calls {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn tasks(&self) -> usize {
        self.tasks.load(Ordering::SeqCst)
    }
}

/// Snapshot-backed service that counts every remote call
pub struct CountingService {
    inner: SnapshotService,
    calls: Arc<Calls>,
}

impl CountingService {
    pub fn new(snapshot: Snapshot) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let service = Self {
            inner: SnapshotService::new("counting", snapshot),
            calls: Arc::clone(&calls),
        };
        (service, calls)
    }
}

#[async_trait]
impl BuildMetadataService for CountingService {
    async fn get_build(&self, ident: &Identifier) -> LineageResult<BuildPayload> {
        self.calls.builds.fetch_add(1, Ordering::SeqCst);
        self.inner.get_build(ident).await
    }

    async fn get_task_result(
        &self,
        task_id: TaskId,
        tolerate_fault: bool,
    ) -> LineageResult<TaskPayload> {
        self.calls.tasks.fetch_add(1, Ordering::SeqCst);
        self.inner.get_task_result(task_id, tolerate_fault).await
    }

    async fn list_builds_for_tag(
        &self,
        tag: &str,
        query: &TagQuery,
    ) -> LineageResult<Vec<BuildSummary>> {
        self.calls.tags.fetch_add(1, Ordering::SeqCst);
        self.inner.list_builds_for_tag(tag, query).await
    }

    fn source_name(&self) -> &str {
        self.inner.source_name()
    }
}

/// Container build payload with optional parent and task
pub fn build(id: i64, nvr: &str, parent: Option<i64>, task: Option<i64>) -> BuildPayload {
    let package_name = nvr.rsplitn(3, '-').last().unwrap_or(nvr).to_string();
    BuildPayload {
        id: BuildId(id),
        nvr: Nvr::from(nvr),
        package_name,
        extra: Some(BuildExtra {
            container_koji_task_id: task.map(LooseId::Number),
            image: Some(ImageExtra {
                parent_build_id: parent.map(LooseId::Number),
                index: Some(ImageIndex {
                    pull: vec![format!("registry.example.com/{}", nvr)],
                    tags: vec!["latest".to_string()],
                }),
            }),
        }),
    }
}

/// Task payload for a container build task
pub fn task(repositories: &[&str], builds: &[i64]) -> TaskPayload {
    TaskPayload {
        repositories: Some(repositories.iter().map(|r| r.to_string()).collect()),
        koji_builds: Some(builds.iter().map(|b| LooseId::Text(b.to_string())).collect()),
        ..TaskPayload::default()
    }
}

/// foo-container (100) on top of base-container (50), which has no parent
pub fn two_level_snapshot() -> Snapshot {
    let mut snapshot = Snapshot {
        builds: vec![
            build(100, "foo-container-1.0-1", Some(50), Some(9001)),
            build(50, "base-container-1.0-1", None, Some(9000)),
        ],
        ..Snapshot::default()
    };
    snapshot
        .tasks
        .insert(9001, task(&["registry.example.com/foo:batch-7"], &[100]));
    snapshot
        .tasks
        .insert(9000, task(&["registry.example.com/base:1.0"], &[50]));
    snapshot
}
