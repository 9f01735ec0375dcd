use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{Config, ShortcutConfig};
use crate::copies::{copy_record, CopyPlan};
use crate::duplicates::{sorted_entries, DuplicateScan};
use crate::error::{ItemError, ValidationError};
use crate::fs::{Filesystem, OsFilesystem};
use crate::links::{ShortcutResolver, ShortcutWriter, SymlinkShortcuts};
use crate::paths::{is_parent_prefix, longest_common_prefix, rewrite_prefix};
use crate::size::format_size;
use crate::task::ProgressSink;
use crate::types::{
    DuplicateEntry, FailedFile, ImportSummary, LastAction, LastOperation, RepositoryEvent,
    RepositorySnapshot, ShortcutRecord,
};

const EVENT_CAPACITY: usize = 64;

/// In-memory collection of resolved shortcuts keyed by shortcut path.
///
/// Not synchronized: one owner runs one bulk operation at a time. Use
/// [`crate::service::ShortcutService`] to drive it from another thread.
pub struct ShortcutRepository {
    records: HashMap<PathBuf, ShortcutRecord>,
    duplicate_index: HashMap<PathBuf, PathBuf>,
    last_operation: LastOperation,
    completed_at: Option<DateTime<Utc>>,
    import_failures: Vec<FailedFile>,
    rewrite_or_copy_failures: Vec<FailedFile>,
    removal_failures: Vec<FailedFile>,
    resolver: Box<dyn ShortcutResolver>,
    writer: Box<dyn ShortcutWriter>,
    filesystem: Box<dyn Filesystem>,
    naming: ShortcutConfig,
    check_free_space: bool,
    events: broadcast::Sender<RepositoryEvent>,
}

impl ShortcutRepository {
    pub fn new(
        resolver: impl ShortcutResolver + 'static,
        writer: impl ShortcutWriter + 'static,
        filesystem: impl Filesystem + 'static,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let config = Config::default();

        Self {
            records: HashMap::new(),
            duplicate_index: HashMap::new(),
            last_operation: LastOperation::None,
            completed_at: None,
            import_failures: Vec::new(),
            rewrite_or_copy_failures: Vec::new(),
            removal_failures: Vec::new(),
            resolver: Box::new(resolver),
            writer: Box::new(writer),
            filesystem: Box::new(filesystem),
            naming: config.shortcuts,
            check_free_space: config.copy.check_free_space,
            events,
        }
    }

    /// Repository over symbolic-link shortcuts on the local filesystem.
    pub fn with_symlinks(config: &Config) -> Self {
        Self::new(SymlinkShortcuts, SymlinkShortcuts, OsFilesystem).with_config(config)
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.naming = config.shortcuts.clone();
        self.check_free_space = config.copy.check_free_space;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<RepositoryEvent> {
        self.events.clone()
    }

    fn notify(&self, event: RepositoryEvent) {
        if self.events.send(event).is_err() {
            debug!(?event, "no subscribers for repository event");
        }
    }

    fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    fn expand_inputs(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        for input in inputs {
            let input = std::path::absolute(input).unwrap_or_else(|_| input.clone());

            if self.filesystem.is_dir(&input) {
                candidates.extend(self.filesystem.list_files(&input));
            } else {
                candidates.push(input);
            }
        }

        candidates
    }

    /// Resolves and adds every file in `inputs`, expanding folders recursively.
    ///
    /// Paths that are already imported are skipped without being re-resolved,
    /// so a changed target is only noticed by [`Self::check_availability`].
    pub fn import(&mut self, inputs: &[PathBuf], progress: &mut dyn ProgressSink) -> ImportSummary {
        if inputs.is_empty() {
            return ImportSummary::default();
        }

        self.last_operation = LastOperation::Imported;
        self.import_failures.clear();

        let candidates = self.expand_inputs(inputs);
        let total = candidates.len();
        let mut imported = 0_usize;

        info!(inputs = inputs.len(), candidates = total, "importing shortcuts");

        for (index, candidate) in candidates.into_iter().enumerate() {
            if progress.is_cancelled() {
                info!(processed = index, "import cancelled");
                break;
            }

            if !self.records.contains_key(&candidate) {
                match self.resolver.resolve(&candidate) {
                    Ok(target) => {
                        let record = ShortcutRecord::new(candidate.clone(), target);
                        self.records.insert(candidate, record);
                        imported += 1;
                    }
                    Err(error) => {
                        debug!(path = %candidate.display(), %error, "shortcut could not be resolved");
                        self.import_failures
                            .push(FailedFile::new(candidate, error.to_string()));
                    }
                }
            }

            progress.report(index + 1, total);
        }

        self.finish();
        info!(imported, failed = self.import_failures.len(), "import finished");

        if imported > 0 || !self.import_failures.is_empty() {
            self.notify(RepositoryEvent::ImportedFilesChanged);
        }

        ImportSummary {
            imported,
            failures: self.import_failures.clone(),
        }
    }

    /// Forgets the given shortcuts. Nothing on disk is touched.
    pub fn remove(&mut self, shortcut_paths: &[PathBuf]) -> usize {
        self.last_operation = LastOperation::Removed;

        let mut removed = 0_usize;
        for path in shortcut_paths {
            if self.records.remove(path).is_some() {
                self.duplicate_index.remove(path);
                removed += 1;
            }
        }

        self.finish();
        info!(requested = shortcut_paths.len(), removed, "removed shortcuts");

        if removed > 0 {
            self.notify(RepositoryEvent::ImportedFilesChanged);
        }

        removed
    }

    /// Re-checks every target on disk and refreshes its size and shape.
    pub fn check_availability(&mut self, progress: &mut dyn ProgressSink) -> usize {
        self.last_operation = LastOperation::CheckedAvailability;

        let total = self.records.len();
        let mut checked = 0_usize;

        for record in self.records.values_mut() {
            if progress.is_cancelled() {
                info!(processed = checked, "availability check cancelled");
                break;
            }

            let info = self.filesystem.inspect_target(&record.target_path);
            record.availability = info.availability;
            record.target_size = info.size;
            record.is_target_folder = info.is_folder;
            record.target_file_count = info.file_count;

            checked += 1;
            progress.report(checked, total);
        }

        self.finish();
        info!(checked, available = self.available_count(), "availability checked");

        if !self.records.is_empty() {
            self.notify(RepositoryEvent::CheckedAvailability);
        }

        checked
    }

    /// Rebuilds the duplicate index from scratch. Returns the number of flagged shortcuts.
    ///
    /// A cancelled scan leaves the previous index in place.
    pub fn check_duplicates(&mut self, progress: &mut dyn ProgressSink) -> usize {
        self.last_operation = LastOperation::CheckedDuplicates;

        let total = self.records.len();
        let mut scan = DuplicateScan::new();
        let mut cancelled = false;

        for (index, record) in self.records.values().enumerate() {
            if progress.is_cancelled() {
                info!(processed = index, "duplicate check cancelled");
                cancelled = true;
                break;
            }

            scan.observe(record.shortcut_path(), &record.target_path);
            progress.report(index + 1, total);
        }

        if !cancelled {
            self.duplicate_index = scan.finish();
        }

        self.finish();
        info!(duplicates = self.duplicate_index.len(), "duplicates checked");

        self.notify(RepositoryEvent::CheckedDuplicates);
        self.duplicate_index.len()
    }

    /// Deletes the selected shortcut files from disk and forgets them.
    pub fn remove_duplicates(
        &mut self,
        selected: &[PathBuf],
        progress: &mut dyn ProgressSink,
    ) -> Vec<FailedFile> {
        self.last_operation = LastOperation::RemovedDuplicates;
        self.removal_failures.clear();

        let total = selected.len();

        for (index, path) in selected.iter().enumerate() {
            if progress.is_cancelled() {
                info!(processed = index, "duplicate removal cancelled");
                break;
            }

            let outcome = if !self.filesystem.exists(path) {
                Err(ItemError::DoesNotExist)
            } else {
                self.filesystem
                    .remove_file(path)
                    .map_err(ItemError::CouldNotDelete)
            };

            match outcome {
                Ok(()) => {
                    self.duplicate_index.remove(path);
                    self.records.remove(path);
                }
                Err(error) => {
                    debug!(path = %path.display(), %error, "duplicate could not be removed");
                    self.removal_failures
                        .push(FailedFile::new(path.clone(), error.to_string()));
                }
            }

            progress.report(index + 1, total);
        }

        self.finish();
        info!(
            selected = total,
            failed = self.removal_failures.len(),
            "duplicates removed"
        );

        self.notify(RepositoryEvent::RemovedDuplicates);
        self.removal_failures.clone()
    }

    pub fn validate_change_parents(
        &self,
        old_prefix: &Path,
        new_prefix: &Path,
    ) -> Result<(), ValidationError> {
        if old_prefix.as_os_str().is_empty() {
            return Err(ValidationError::EmptyOldPrefix);
        }

        if old_prefix == new_prefix {
            return Err(ValidationError::SamePrefix);
        }

        if !self.filesystem.is_dir(new_prefix) {
            return Err(ValidationError::NewPrefixNotDirectory {
                path: new_prefix.to_path_buf(),
            });
        }

        if let Some(record) = self
            .records
            .values()
            .find(|record| !is_parent_prefix(old_prefix, &record.target_path))
        {
            return Err(ValidationError::OldPrefixNotCommon {
                prefix: old_prefix.to_path_buf(),
                target: record.target_path.clone(),
            });
        }

        Ok(())
    }

    /// Moves every target from under `old_prefix` to under `new_prefix`, rewriting each shortcut.
    pub fn change_parents(
        &mut self,
        old_prefix: &Path,
        new_prefix: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<FailedFile>, ValidationError> {
        self.validate_change_parents(old_prefix, new_prefix)
            .inspect_err(|error| warn!(%error, "parent change rejected"))?;

        Ok(self.apply_change_parents(old_prefix, new_prefix, progress))
    }

    pub(crate) fn apply_change_parents(
        &mut self,
        old_prefix: &Path,
        new_prefix: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Vec<FailedFile> {
        self.last_operation = LastOperation::ChangedParents;
        self.rewrite_or_copy_failures.clear();

        let total = self.records.len();
        let mut processed = 0_usize;

        info!(
            old = %old_prefix.display(),
            new = %new_prefix.display(),
            shortcuts = total,
            "changing parents"
        );

        for record in self.records.values_mut() {
            if progress.is_cancelled() {
                info!(processed, "parent change cancelled");
                break;
            }

            let new_target = rewrite_prefix(&record.target_path, old_prefix, new_prefix);

            match self.writer.write(&new_target, record.shortcut_path()) {
                Ok(()) => {
                    record.target_path = new_target;
                    record.last_action = LastAction::Modified;
                }
                Err(error) => {
                    let error = ItemError::Write(error);
                    debug!(path = %record.shortcut_path().display(), %error, "shortcut not rewritten");
                    record.last_action = LastAction::FailedModified;
                    self.rewrite_or_copy_failures.push(FailedFile::new(
                        record.shortcut_path(),
                        error.to_string(),
                    ));
                }
            }

            processed += 1;
            progress.report(processed, total);
        }

        self.finish();
        info!(
            processed,
            failed = self.rewrite_or_copy_failures.len(),
            "parents changed"
        );

        self.notify(RepositoryEvent::ChangedParents);
        self.rewrite_or_copy_failures.clone()
    }

    pub fn validate_copy(&self, destination_root: &Path) -> Result<(), ValidationError> {
        if self.records.is_empty() {
            return Err(ValidationError::NothingImported);
        }

        if !self.filesystem.is_dir(destination_root) {
            return Err(ValidationError::DestinationNotDirectory {
                path: destination_root.to_path_buf(),
            });
        }

        if !self.check_free_space {
            return Ok(());
        }

        let required = self.total_target_bytes();
        match self.filesystem.free_space(destination_root) {
            Ok(available) if available < required => {
                Err(ValidationError::InsufficientSpace { required, available })
            }
            Ok(available) => {
                debug!(
                    required = %format_size(required),
                    available = %format_size(available),
                    "enough free space for copy"
                );
                Ok(())
            }
            Err(error) => {
                warn!(path = %destination_root.display(), %error, "free space unknown, copying anyway");
                Ok(())
            }
        }
    }

    /// Copies every available target into `destination_root`.
    pub fn copy_targets(
        &mut self,
        destination_root: &Path,
        preserve_hierarchy: bool,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<FailedFile>, ValidationError> {
        self.validate_copy(destination_root)
            .inspect_err(|error| warn!(%error, "copy rejected"))?;

        Ok(self.apply_copy_targets(destination_root, preserve_hierarchy, progress))
    }

    pub(crate) fn apply_copy_targets(
        &mut self,
        destination_root: &Path,
        preserve_hierarchy: bool,
        progress: &mut dyn ProgressSink,
    ) -> Vec<FailedFile> {
        self.last_operation = LastOperation::CreatedCopies;
        self.rewrite_or_copy_failures.clear();

        let plan = {
            let shortcut_paths: Vec<&Path> = self.records.keys().map(PathBuf::as_path).collect();
            CopyPlan::new(
                destination_root,
                preserve_hierarchy,
                &shortcut_paths,
                self.naming.clone(),
            )
        };

        let total = self.available_count();
        let mut processed = 0_usize;

        info!(
            destination = %destination_root.display(),
            preserve_hierarchy,
            targets = total,
            size = %format_size(self.total_target_bytes()),
            "copying targets"
        );

        for record in self
            .records
            .values_mut()
            .filter(|record| record.availability.is_available())
        {
            if progress.is_cancelled() {
                info!(processed, "copy cancelled");
                break;
            }

            match copy_record(self.filesystem.as_ref(), &plan, record) {
                Ok(bytes) => {
                    debug!(path = %record.target_path.display(), bytes, "target copied");
                    record.last_action = LastAction::Saved;
                }
                Err(error) => {
                    debug!(path = %record.target_path.display(), %error, "target not copied");
                    record.last_action = LastAction::FailedSaved;
                    self.rewrite_or_copy_failures.push(FailedFile::new(
                        record.shortcut_path(),
                        error.to_string(),
                    ));
                }
            }

            processed += 1;
            progress.report(processed, total);
        }

        self.finish();
        info!(
            processed,
            failed = self.rewrite_or_copy_failures.len(),
            "targets copied"
        );

        self.notify(RepositoryEvent::CreatedCopies);
        self.rewrite_or_copy_failures.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, shortcut_path: &Path) -> Option<&ShortcutRecord> {
        self.records.get(shortcut_path)
    }

    pub fn records(&self) -> impl Iterator<Item = &ShortcutRecord> {
        self.records.values()
    }

    pub fn duplicate_index(&self) -> &HashMap<PathBuf, PathBuf> {
        &self.duplicate_index
    }

    pub fn duplicates(&self) -> Vec<DuplicateEntry> {
        sorted_entries(&self.duplicate_index)
    }

    pub fn last_operation(&self) -> LastOperation {
        self.last_operation
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn import_failures(&self) -> &[FailedFile] {
        &self.import_failures
    }

    pub fn rewrite_or_copy_failures(&self) -> &[FailedFile] {
        &self.rewrite_or_copy_failures
    }

    pub fn removal_failures(&self) -> &[FailedFile] {
        &self.removal_failures
    }

    pub fn available_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| record.availability.is_available())
            .count()
    }

    pub fn total_target_bytes(&self) -> u64 {
        self.records.values().map(|record| record.target_size).sum()
    }

    /// Deepest folder containing every target; the natural old prefix for a parent change.
    pub fn common_target_parent(&self) -> PathBuf {
        let targets: Vec<&Path> = self
            .records
            .values()
            .map(|record| record.target_path.as_path())
            .collect();
        longest_common_prefix(&targets)
    }

    pub fn snapshot(&self) -> RepositorySnapshot {
        let mut records: Vec<ShortcutRecord> = self.records.values().cloned().collect();
        records.sort_by(|left, right| left.shortcut_path().cmp(right.shortcut_path()));

        RepositorySnapshot {
            records,
            duplicates: self.duplicates(),
            last_operation: self.last_operation,
            completed_at: self.completed_at,
            import_failures: self.import_failures.clone(),
            rewrite_or_copy_failures: self.rewrite_or_copy_failures.clone(),
            removal_failures: self.removal_failures.clone(),
            available_count: self.available_count(),
            total_target_bytes: self.total_target_bytes(),
            common_target_parent: self.common_target_parent(),
        }
    }
}
