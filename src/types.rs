use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Availability {
    #[default]
    Unknown,
    Available,
    /// Target exists but its canonical path differs from the stored one (usually letter case).
    AvailableCaseMismatch,
    Unavailable,
}

impl Availability {
    pub fn is_available(self) -> bool {
        matches!(self, Availability::Available | Availability::AvailableCaseMismatch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LastAction {
    #[default]
    None,
    Saved,
    Modified,
    FailedModified,
    FailedSaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LastOperation {
    #[default]
    None,
    Imported,
    Removed,
    CheckedAvailability,
    CheckedDuplicates,
    RemovedDuplicates,
    ChangedParents,
    CreatedCopies,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutRecord {
    shortcut_path: PathBuf,
    pub file_name: String,
    pub target_path: PathBuf,
    pub availability: Availability,
    pub target_size: u64,
    pub is_target_folder: bool,
    pub target_file_count: u64,
    pub last_action: LastAction,
}

impl ShortcutRecord {
    pub fn new(shortcut_path: PathBuf, target_path: PathBuf) -> Self {
        let file_name = shortcut_path
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            shortcut_path,
            file_name,
            target_path,
            availability: Availability::Unknown,
            target_size: 0,
            is_target_folder: false,
            target_file_count: 0,
            last_action: LastAction::None,
        }
    }

    /// Repository key. Fixed for the lifetime of the record.
    pub fn shortcut_path(&self) -> &Path {
        &self.shortcut_path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub message: String,
}

impl FailedFile {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateEntry {
    pub shortcut_path: PathBuf,
    pub target_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        self.done as f64 / self.total as f64
    }
}

/// Completion notifications. Subscribers re-query the repository for the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepositoryEvent {
    ImportedFilesChanged,
    CheckedAvailability,
    CheckedDuplicates,
    RemovedDuplicates,
    ChangedParents,
    CreatedCopies,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub failures: Vec<FailedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySnapshot {
    pub records: Vec<ShortcutRecord>,
    pub duplicates: Vec<DuplicateEntry>,
    pub last_operation: LastOperation,
    pub completed_at: Option<DateTime<Utc>>,
    pub import_failures: Vec<FailedFile>,
    pub rewrite_or_copy_failures: Vec<FailedFile>,
    pub removal_failures: Vec<FailedFile>,
    pub available_count: usize,
    pub total_target_bytes: u64,
    pub common_target_parent: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
}
