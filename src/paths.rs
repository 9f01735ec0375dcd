//! Segment-wise path algebra over `std::path` components. No I/O.

use std::path::{Component, Path, PathBuf};

fn parent_components(path: &Path) -> Vec<Component<'_>> {
    let mut components: Vec<_> = path.components().collect();
    components.pop();
    components
}

/// Longest run of leading folders shared by the parents of every path.
///
/// The last component of each path is treated as a file name and never takes
/// part in the match. Returns an empty path for an empty input or when the
/// parents share nothing at all.
pub fn longest_common_prefix<P: AsRef<Path>>(paths: &[P]) -> PathBuf {
    let mut remaining = paths.iter();

    let Some(first) = remaining.next() else {
        return PathBuf::new();
    };

    let mut candidate = parent_components(first.as_ref());

    for path in remaining {
        if candidate.is_empty() {
            break;
        }

        let parent = parent_components(path.as_ref());
        let matched = candidate
            .iter()
            .zip(parent.iter())
            .take_while(|(left, right)| left == right)
            .count();

        candidate.truncate(matched);
    }

    candidate.iter().collect()
}

pub fn segment_count(path: &Path) -> usize {
    path.components().count()
}

/// Replaces the first `segment_count(old_prefix)` components of `path` with `new_prefix`.
///
/// `old_prefix` must be a segment-wise prefix of the parent of `path`; otherwise
/// the result is meaningless. See [`is_parent_prefix`].
pub fn rewrite_prefix(path: &Path, old_prefix: &Path, new_prefix: &Path) -> PathBuf {
    let mut rewritten = new_prefix.to_path_buf();
    rewritten.extend(path.components().skip(segment_count(old_prefix)));
    rewritten
}

/// Folders of `path` below its first `prefix_segments` components, file name excluded.
pub fn relative_suffix_below(path: &Path, prefix_segments: usize) -> PathBuf {
    let mut components: Vec<_> = path.components().skip(prefix_segments).collect();
    components.pop();
    components.iter().collect()
}

pub fn is_parent_prefix(prefix: &Path, path: &Path) -> bool {
    path.parent()
        .map(|parent| parent.starts_with(prefix))
        .unwrap_or(false)
}

/// Drops `.` and resolves `..` against the preceding folder without touching the disk.
///
/// A `..` that would climb above the root is dropped; leading `..` of a relative
/// path are kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Strips the verbatim prefix Windows puts on canonical paths.
pub fn normalize_display_path(path: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        let value = path.to_string_lossy();

        if let Some(rest) = value.strip_prefix(r"\\?\UNC\") {
            return PathBuf::from(format!(r"\\{rest}"));
        }

        if let Some(rest) = value.strip_prefix(r"\\?\") {
            return PathBuf::from(rest);
        }
    }

    path.to_path_buf()
}
