//! Build identities and the records cached for them
//!
//! Payload types mirror what the build system hands back. Records are the
//! normalized, immutable snapshots the caches hold.

use crate::error::{LineageError, LineageResult};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Primary identity of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub i64);

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the build-system task that produced a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name-version-release string of a build
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nvr(pub String);

impl Nvr {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nvr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Nvr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A build reference as supplied by a caller: either a numeric id or an NVR
///
/// Parsed once at the API boundary. Anything that parses as an integer is
/// a build id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    BuildId(BuildId),
    Nvr(Nvr),
}

impl FromStr for Identifier {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(id) => Self::BuildId(BuildId(id)),
            Err(_) => Self::Nvr(Nvr(s.to_string())),
        })
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(ident) => ident,
            Err(never) => match never {},
        }
    }
}

impl From<BuildId> for Identifier {
    fn from(id: BuildId) -> Self {
        Self::BuildId(id)
    }
}

impl From<Nvr> for Identifier {
    fn from(nvr: Nvr) -> Self {
        Self::Nvr(nvr)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildId(id) => write!(f, "{}", id),
            Self::Nvr(nvr) => write!(f, "{}", nvr),
        }
    }
}

/// An id that the build system may send as a number or a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseId {
    Number(i64),
    Text(String),
}

impl LooseId {
    /// Parse to an integer, failing on non-numeric text
    pub fn to_i64(&self) -> LineageResult<i64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| LineageError::Service(format!("malformed id in payload: {:?}", s))),
        }
    }
}

/// Build metadata as returned by the build system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPayload {
    pub id: BuildId,
    pub nvr: Nvr,
    pub package_name: String,
    #[serde(default)]
    pub extra: Option<BuildExtra>,
}

/// `extra` section of a build payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildExtra {
    #[serde(default)]
    pub container_koji_task_id: Option<LooseId>,
    #[serde(default)]
    pub image: Option<ImageExtra>,
}

/// `extra.image` section of a build payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageExtra {
    #[serde(default)]
    pub parent_build_id: Option<LooseId>,
    #[serde(default)]
    pub index: Option<ImageIndex>,
}

/// Pullspecs and tags recorded on the image index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageIndex {
    #[serde(default)]
    pub pull: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Normalized snapshot of one build
///
/// Never mutated once created; a re-fetch replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub build_id: BuildId,
    pub nvr: Nvr,
    pub package_name: String,
    pub parent_build_id: Option<BuildId>,
    pub build_task_id: Option<TaskId>,
    pub pullspecs: Vec<String>,
    pub tags: Vec<String>,
}

impl TryFrom<BuildPayload> for BuildRecord {
    type Error = LineageError;

    fn try_from(payload: BuildPayload) -> LineageResult<Self> {
        let extra = payload.extra.unwrap_or_default();
        let image = extra.image.unwrap_or_default();
        let index = image.index.unwrap_or_default();

        // An absent parent key and an explicit null both mean "no parent".
        let parent_build_id = image
            .parent_build_id
            .as_ref()
            .map(|id| id.to_i64().map(BuildId))
            .transpose()?;
        let build_task_id = extra
            .container_koji_task_id
            .as_ref()
            .map(|id| id.to_i64().map(TaskId))
            .transpose()?;

        Ok(Self {
            build_id: payload.id,
            nvr: payload.nvr,
            package_name: payload.package_name,
            parent_build_id,
            build_task_id,
            pullspecs: index.pull,
            tags: index.tags,
        })
    }
}

/// Task result as returned by the build system
///
/// With fault tolerance requested, a failed task comes back as a payload
/// carrying `faultCode`/`faultString` rather than as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub repositories: Option<Vec<String>>,
    #[serde(default)]
    pub koji_builds: Option<Vec<LooseId>>,
    #[serde(default, rename = "faultCode")]
    pub fault_code: Option<i64>,
    #[serde(default, rename = "faultString")]
    pub fault_string: Option<String>,
}

/// Fault carried by an error-shaped task result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFault {
    pub code: i64,
    pub message: String,
}

/// Normalized result of one build-system task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub repositories: Option<Vec<String>>,
    pub koji_builds: Option<Vec<BuildId>>,
    pub fault: Option<TaskFault>,
}

impl TaskResult {
    /// Normalize a task payload fetched for `task_id`
    pub fn from_payload(task_id: TaskId, payload: TaskPayload) -> LineageResult<Self> {
        let koji_builds = payload
            .koji_builds
            .map(|ids| {
                ids.iter()
                    .map(|id| id.to_i64().map(BuildId))
                    .collect::<LineageResult<Vec<_>>>()
            })
            .transpose()?;

        let fault = match (payload.fault_code, payload.fault_string) {
            (None, None) => None,
            (code, message) => Some(TaskFault {
                code: code.unwrap_or_default(),
                message: message.unwrap_or_default(),
            }),
        };

        Ok(Self {
            task_id,
            repositories: payload.repositories,
            koji_builds,
            fault,
        })
    }

    /// Whether this is a container build task (it published repositories)
    pub fn is_container_task(&self) -> bool {
        self.repositories.is_some()
    }
}

/// One entry of a tag listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub build_id: BuildId,
    pub nvr: Nvr,
    pub package_name: String,
}

/// Options for listing the builds of a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagQuery {
    /// Only the latest build of each package
    pub latest: bool,
    /// Include builds inherited from parent tags
    pub inherit: bool,
    /// Restrict to a build type (e.g. "image")
    pub build_type: Option<String>,
}

impl Default for TagQuery {
    fn default() -> Self {
        Self {
            latest: false,
            inherit: false,
            build_type: Some("image".to_string()),
        }
    }
}

/// A build joined with what its task published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub package_name: String,
    pub nvr: Nvr,
    pub build_id: BuildId,
    pub build_pullspecs: Vec<String>,
    pub build_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_build_id: Option<BuildId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_pullspecs: Option<Vec<String>>,
}
