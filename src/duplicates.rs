use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::types::DuplicateEntry;

/// Single-pass collision scan of (shortcut, target) pairs.
#[derive(Debug, Default)]
pub struct DuplicateScan<'a> {
    first_seen: HashMap<&'a Path, &'a Path>,
    flagged: HashSet<&'a Path>,
    index: HashMap<PathBuf, PathBuf>,
}

impl<'a> DuplicateScan<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, shortcut: &'a Path, target: &'a Path) {
        let Some(&first) = self.first_seen.get(target) else {
            self.first_seen.insert(target, shortcut);
            return;
        };

        // The first shortcut of a group is only added on the group's first collision.
        if self.flagged.insert(target) {
            self.index.insert(first.to_path_buf(), target.to_path_buf());
        }

        self.index.insert(shortcut.to_path_buf(), target.to_path_buf());
    }

    /// Shortcut path -> shared target, for every member of a group of two or more.
    pub fn finish(self) -> HashMap<PathBuf, PathBuf> {
        self.index
    }
}

pub fn find_duplicates<'a, I>(pairs: I) -> HashMap<PathBuf, PathBuf>
where
    I: IntoIterator<Item = (&'a Path, &'a Path)>,
{
    let mut scan = DuplicateScan::new();
    for (shortcut, target) in pairs {
        scan.observe(shortcut, target);
    }
    scan.finish()
}

/// Index entries grouped by target, then by shortcut path.
pub fn sorted_entries(index: &HashMap<PathBuf, PathBuf>) -> Vec<DuplicateEntry> {
    let mut entries: Vec<DuplicateEntry> = index
        .iter()
        .map(|(shortcut, target)| DuplicateEntry {
            shortcut_path: shortcut.clone(),
            target_path: target.clone(),
        })
        .collect();

    entries.sort_by(|left, right| {
        left.target_path
            .cmp(&right.target_path)
            .then_with(|| left.shortcut_path.cmp(&right.shortcut_path))
    });
    entries
}
