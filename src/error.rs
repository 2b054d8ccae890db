//! Error types for koji-lineage
//!
//! All modules use `LineageResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lineage operations
pub type LineageResult<T> = Result<T, LineageError>;

/// All errors that can occur while resolving builds
#[derive(Error, Debug)]
pub enum LineageError {
    // Build metadata service errors
    #[error("Build not found: {0}")]
    BuildNotFound(String),

    #[error("Task result unavailable for task {task_id}: {reason}")]
    TaskResultUnavailable { task_id: i64, reason: String },

    #[error("Build metadata service error: {0}")]
    Service(String),

    #[error("No build metadata source configured")]
    NoSource,

    // Cache persistence errors
    #[error("Failed to load cache {name} from {path}: {reason}")]
    CacheLoad {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to save cache {name} to {path}: {source}")]
    CacheSave {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Lineage errors
    #[error("Parent chain of build {build_id} loops back on itself")]
    LineageCycle { build_id: i64 },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot {path}: {reason}")]
    SnapshotInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl LineageError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache save error for a named cache file
    pub fn cache_save(name: impl Into<String>, path: PathBuf, source: std::io::Error) -> Self {
        Self::CacheSave {
            name: name.into(),
            path,
            source,
        }
    }

    /// Whether the error came from the build metadata service
    ///
    /// These are surfaced unchanged; this layer never retries them.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::BuildNotFound(_) | Self::TaskResultUnavailable { .. } | Self::Service(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::BuildNotFound(_) => Some("Check the build id or NVR spelling"),
            Self::CacheLoad { .. } => Some("Run: koji-lineage cache clear"),
            Self::CacheSave { .. } => Some("Check permissions on the cache directory"),
            Self::SnapshotInvalid { .. } => Some("Pass a JSON export with --snapshot"),
            Self::NoSource => Some("Pass --snapshot or set source.snapshot in config.toml"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = LineageError::BuildNotFound("foo-container-1.0-1".to_string());
        assert!(err.to_string().contains("Build not found"));
        assert!(err.to_string().contains("foo-container-1.0-1"));
    }

    #[test]
    fn error_hint() {
        let err = LineageError::BuildNotFound("42".to_string());
        assert_eq!(err.hint(), Some("Check the build id or NVR spelling"));
        assert_eq!(LineageError::LineageCycle { build_id: 1 }.hint(), None);
    }

    #[test]
    fn error_remote() {
        assert!(LineageError::Service("timeout".to_string()).is_remote());
        assert!(!LineageError::LineageCycle { build_id: 7 }.is_remote());
    }
}
