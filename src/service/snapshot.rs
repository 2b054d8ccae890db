//! Build metadata served from a JSON export
//!
//! ```json
//! {
//!   "builds": [{"id": 100, "nvr": "foo-container-1.0-1", "package_name": "foo-container",
//!               "extra": {"container_koji_task_id": 9001, "image": {"parent_build_id": 50}}}],
//!   "tasks": {"9001": {"repositories": ["registry/foo:1.0-1"], "koji_builds": ["100"]}},
//!   "tags": {"rhos-17-candidate": [{"build_id": 100, "nvr": "foo-container-1.0-1",
//!                                   "package_name": "foo-container"}]}
//! }
//! ```

use crate::error::{LineageError, LineageResult};
use crate::service::BuildMetadataService;
use crate::types::{
    BuildId, BuildPayload, BuildSummary, Identifier, Nvr, TagQuery, TaskId, TaskPayload,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Fault code reported for tasks the export does not contain
const NO_SUCH_TASK_FAULT: i64 = 1000;

/// One build listed under a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagEntry {
    #[serde(flatten)]
    pub build: BuildSummary,

    /// Build type, e.g. "image"
    #[serde(default)]
    pub build_type: Option<String>,

    /// Listed only through tag inheritance
    #[serde(default)]
    pub inherited: bool,
}

/// Serialized form of an export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub builds: Vec<BuildPayload>,
    pub tasks: HashMap<i64, TaskPayload>,
    pub tags: HashMap<String, Vec<TagEntry>>,
}

/// In-memory build metadata service backed by a [`Snapshot`]
#[derive(Debug, Clone)]
pub struct SnapshotService {
    name: String,
    by_id: HashMap<BuildId, BuildPayload>,
    by_nvr: HashMap<Nvr, BuildId>,
    tasks: HashMap<i64, TaskPayload>,
    tags: HashMap<String, Vec<TagEntry>>,
}

impl SnapshotService {
    /// Index an export
    pub fn new(name: impl Into<String>, snapshot: Snapshot) -> Self {
        let mut by_id = HashMap::new();
        let mut by_nvr = HashMap::new();
        for build in snapshot.builds {
            by_nvr.insert(build.nvr.clone(), build.id);
            by_id.insert(build.id, build);
        }

        Self {
            name: name.into(),
            by_id,
            by_nvr,
            tasks: snapshot.tasks,
            tags: snapshot.tags,
        }
    }

    /// Load an export from a JSON file
    pub async fn from_file(path: &Path) -> LineageResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            LineageError::io(format!("reading snapshot {}", path.display()), e)
        })?;

        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| LineageError::SnapshotInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        debug!(
            "Loaded snapshot {} with {} builds, {} tasks, {} tags",
            path.display(),
            snapshot.builds.len(),
            snapshot.tasks.len(),
            snapshot.tags.len()
        );
        Ok(Self::new(path.display().to_string(), snapshot))
    }

    fn filter_tag(entries: &[TagEntry], query: &TagQuery) -> Vec<BuildSummary> {
        let selected = entries.iter().filter(|entry| {
            let type_matches = match (&query.build_type, &entry.build_type) {
                (Some(wanted), Some(actual)) => wanted == actual,
                _ => true,
            };
            type_matches && (query.inherit || !entry.inherited)
        });

        if !query.latest {
            return selected.map(|entry| entry.build.clone()).collect();
        }

        // Latest build per package is the one with the highest id.
        let mut latest: BTreeMap<&str, &BuildSummary> = BTreeMap::new();
        for entry in selected {
            let slot = latest.entry(entry.build.package_name.as_str()).or_insert(&entry.build);
            if entry.build.build_id > slot.build_id {
                *slot = &entry.build;
            }
        }
        latest.into_values().cloned().collect()
    }
}

#[async_trait]
impl BuildMetadataService for SnapshotService {
    async fn get_build(&self, ident: &Identifier) -> LineageResult<BuildPayload> {
        let id = match ident {
            Identifier::BuildId(id) => Some(*id),
            Identifier::Nvr(nvr) => self.by_nvr.get(nvr).copied(),
        };

        id.and_then(|id| self.by_id.get(&id))
            .cloned()
            .ok_or_else(|| LineageError::BuildNotFound(ident.to_string()))
    }

    async fn get_task_result(
        &self,
        task_id: TaskId,
        tolerate_fault: bool,
    ) -> LineageResult<TaskPayload> {
        let payload = match self.tasks.get(&task_id.0) {
            Some(payload) => payload.clone(),
            None => TaskPayload {
                fault_code: Some(NO_SUCH_TASK_FAULT),
                fault_string: Some(format!("No such task: {}", task_id)),
                ..TaskPayload::default()
            },
        };

        let faulted = payload.fault_code.is_some() || payload.fault_string.is_some();
        if faulted && !tolerate_fault {
            return Err(LineageError::TaskResultUnavailable {
                task_id: task_id.0,
                reason: payload
                    .fault_string
                    .unwrap_or_else(|| "task failed".to_string()),
            });
        }
        Ok(payload)
    }

    async fn list_builds_for_tag(
        &self,
        tag: &str,
        query: &TagQuery,
    ) -> LineageResult<Vec<BuildSummary>> {
        Ok(self
            .tags
            .get(tag)
            .map(|entries| Self::filter_tag(entries, query))
            .unwrap_or_default())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
