use std::path::{Path, PathBuf};

use crate::config::ShortcutConfig;
use crate::error::ItemError;
use crate::fs::Filesystem;
use crate::paths::{longest_common_prefix, relative_suffix_below, segment_count};
use crate::types::ShortcutRecord;

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;

    if !value.is_char_boundary(split) || !value[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }

    Some(&value[..split])
}

/// Name a copied target gets: the shortcut's name without the shell's
/// " - Shortcut" suffix and without the shortcut extension.
pub fn destination_file_name(shortcut_name: &str, naming: &ShortcutConfig) -> String {
    let extension = format!(".{}", naming.extension);
    let suffixed = format!("{}{}", naming.name_suffix, extension);

    for suffix in [suffixed.as_str(), extension.as_str()] {
        if let Some(stem) = strip_suffix_ignore_case(shortcut_name, suffix) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }

    shortcut_name.to_string()
}

/// Where each target of a copy batch lands.
#[derive(Debug, Clone)]
pub struct CopyPlan {
    destination_root: PathBuf,
    /// Segment count of the shortcuts' common parent, when mirroring folders.
    hierarchy_base: Option<usize>,
    naming: ShortcutConfig,
}

impl CopyPlan {
    pub fn new<P: AsRef<Path>>(
        destination_root: &Path,
        preserve_hierarchy: bool,
        shortcut_paths: &[P],
        naming: ShortcutConfig,
    ) -> Self {
        let hierarchy_base = preserve_hierarchy
            .then(|| segment_count(&longest_common_prefix(shortcut_paths)));

        Self {
            destination_root: destination_root.to_path_buf(),
            hierarchy_base,
            naming,
        }
    }

    pub fn folder_for(&self, shortcut_path: &Path) -> PathBuf {
        match self.hierarchy_base {
            Some(base) => self
                .destination_root
                .join(relative_suffix_below(shortcut_path, base)),
            None => self.destination_root.clone(),
        }
    }

    pub fn destination_for(&self, record: &ShortcutRecord) -> PathBuf {
        self.folder_for(record.shortcut_path())
            .join(destination_file_name(&record.file_name, &self.naming))
    }
}

/// Copies one record's target into place, creating mirrored folders as needed.
pub fn copy_record(
    filesystem: &dyn Filesystem,
    plan: &CopyPlan,
    record: &ShortcutRecord,
) -> Result<u64, ItemError> {
    if !filesystem.exists(&record.target_path) {
        return Err(ItemError::TargetMissing {
            path: record.target_path.clone(),
        });
    }

    let folder = plan.folder_for(record.shortcut_path());
    if !filesystem.is_dir(&folder) {
        filesystem
            .create_dir_all(&folder)
            .map_err(|source| ItemError::CreateDirectory {
                path: folder.clone(),
                source,
            })?;
    }

    filesystem
        .copy_target(&record.target_path, &plan.destination_for(record))
        .map_err(ItemError::Copy)
}
