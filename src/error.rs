//! Error types. Per-item failures end up as messages in the repository's
//! failure lists; validation and service errors are returned to the caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::size::format_size;

/// A candidate file could not be turned into a shortcut record.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("not a shortcut: {}", path.display())]
    NotAShortcut { path: PathBuf },

    #[error("shortcut target is empty")]
    EmptyTarget,

    #[error("failed to read shortcut: {0}")]
    Read(#[from] std::io::Error),
}

/// Failure of a single item inside a bulk operation. Never aborts the batch.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("does not exist")]
    DoesNotExist,

    #[error("could not be deleted: {0}")]
    CouldNotDelete(#[source] std::io::Error),

    #[error("failed to rewrite shortcut: {0}")]
    Write(#[source] std::io::Error),

    #[error("target does not exist: {}", path.display())]
    TargetMissing { path: PathBuf },

    #[error("failed to create folder {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy target: {0}")]
    Copy(#[source] std::io::Error),
}

/// Rejection of a whole rewrite/copy request before any item is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("old parent path is empty")]
    EmptyOldPrefix,

    #[error("old parent path {} is not a parent of {}", prefix.display(), target.display())]
    OldPrefixNotCommon { prefix: PathBuf, target: PathBuf },

    #[error("new parent path is not an existing folder: {}", path.display())]
    NewPrefixNotDirectory { path: PathBuf },

    #[error("old and new parent paths are the same")]
    SamePrefix,

    #[error("destination is not an existing folder: {}", path.display())]
    DestinationNotDirectory { path: PathBuf },

    #[error("no shortcuts are imported")]
    NothingImported,

    #[error(
        "not enough free space: {} required, {} available",
        format_size(*.required),
        format_size(*.available)
    )]
    InsufficientSpace { required: u64, available: u64 },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to spawn repository worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("repository worker has stopped")]
    WorkerStopped,

    #[error("task was dropped before it completed")]
    TaskDropped,
}

/// Outcome of submitting a validated operation to the service.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot resolve home directory")]
    HomeDirectory,

    #[error("Failed to create config directory: {0}")]
    CreateDirectory(#[source] std::io::Error),

    #[error("Failed to read config: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to write config: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create export file: {0}")]
    Create(#[source] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to flush export file: {0}")]
    Flush(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_errors_render_failure_messages() {
        assert_eq!(ItemError::DoesNotExist.to_string(), "does not exist");

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            ItemError::CouldNotDelete(denied).to_string(),
            "could not be deleted: denied"
        );
    }

    #[test]
    fn validation_and_service_errors_stay_distinct() {
        let validation: OperationError = ValidationError::SamePrefix.into();
        assert!(matches!(validation, OperationError::Validation(ValidationError::SamePrefix)));

        let service: OperationError = ServiceError::WorkerStopped.into();
        assert!(matches!(service, OperationError::Service(_)));
        assert_eq!(service.to_string(), "repository worker has stopped");
    }

    #[test]
    fn insufficient_space_reports_both_sizes() {
        let error = ValidationError::InsufficientSpace {
            required: 2048,
            available: 1024,
        };
        assert_eq!(
            error.to_string(),
            "not enough free space: 2.00 KB required, 1.00 KB available"
        );
    }
}
