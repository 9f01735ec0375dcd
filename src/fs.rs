use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::paths::normalize_display_path;
use crate::types::Availability;

/// What an availability check learns about a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetInfo {
    pub availability: Availability,
    pub size: u64,
    pub is_folder: bool,
    pub file_count: u64,
}

impl TargetInfo {
    pub fn missing() -> Self {
        Self {
            availability: Availability::Unavailable,
            size: 0,
            is_folder: false,
            file_count: 0,
        }
    }
}

/// Filesystem access used by the repository. All calls are synchronous.
pub trait Filesystem: Send {
    /// Every non-folder entry below `root`, recursively. Links are listed, not followed.
    fn list_files(&self, root: &Path) -> Vec<PathBuf>;

    fn exists(&self, path: &Path) -> bool;

    /// True for a real folder; a link to a folder is not one.
    fn is_dir(&self, path: &Path) -> bool;

    fn inspect_target(&self, path: &Path) -> TargetInfo;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copies a file, or a folder tree, overwriting what is already there.
    fn copy_target(&self, source: &Path, destination: &Path) -> io::Result<u64>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Free bytes available to this process on the volume holding `path`.
    fn free_space(&self, path: &Path) -> io::Result<u64>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

fn classify(path: &Path) -> Availability {
    match path.canonicalize() {
        Ok(canonical) if normalize_display_path(&canonical).as_os_str() == path.as_os_str() => {
            Availability::Available
        }
        Ok(_) | Err(_) => Availability::AvailableCaseMismatch,
    }
}

fn folder_totals(path: &Path) -> (u64, u64) {
    let mut size = 0_u64;
    let mut count = 0_u64;

    for item in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if item.file_type().is_dir() {
            continue;
        }

        count += 1;
        size += item.metadata().map(|metadata| metadata.len()).unwrap_or(0);
    }

    (size, count)
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<u64> {
    let mut copied = 0_u64;

    for item in WalkDir::new(source).follow_links(false) {
        let item = item.map_err(io::Error::other)?;
        let relative = item
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);

        if item.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copied += fs::copy(item.path(), &target)?;
        }
    }

    Ok(copied)
}

impl Filesystem for OsFilesystem {
    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for item in WalkDir::new(root).follow_links(false) {
            match item {
                Ok(entry) if !entry.file_type().is_dir() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(error) => debug!(root = %root.display(), %error, "skipping unreadable entry"),
            }
        }

        files
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false)
    }

    fn inspect_target(&self, path: &Path) -> TargetInfo {
        let metadata = match fs::metadata(path) {
            Ok(value) => value,
            Err(_) => return TargetInfo::missing(),
        };

        let (size, file_count) = if metadata.is_dir() {
            folder_totals(path)
        } else {
            (metadata.len(), 1)
        };

        TargetInfo {
            availability: classify(path),
            size,
            is_folder: metadata.is_dir(),
            file_count,
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy_target(&self, source: &Path, destination: &Path) -> io::Result<u64> {
        if fs::metadata(source)?.is_dir() {
            copy_tree(source, destination)
        } else {
            fs::copy(source, destination)
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn free_space(&self, path: &Path) -> io::Result<u64> {
        fs4::available_space(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_root() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = normalize_display_path(&dir.path().canonicalize().expect("canonical root"));
        (dir, root)
    }

    #[test]
    fn missing_target_is_unavailable_with_zero_size() {
        let (_dir, root) = canonical_root();
        let info = OsFilesystem.inspect_target(&root.join("nope.txt"));
        assert_eq!(info, TargetInfo::missing());
    }

    #[test]
    fn file_target_reports_its_length() {
        let (_dir, root) = canonical_root();
        let file = root.join("song.mp3");
        fs::write(&file, b"12345").expect("write");

        let info = OsFilesystem.inspect_target(&file);
        assert_eq!(info.availability, Availability::Available);
        assert_eq!(info.size, 5);
        assert_eq!(info.file_count, 1);
        assert!(!info.is_folder);
    }

    #[test]
    fn folder_target_sums_nested_files() {
        let (_dir, root) = canonical_root();
        let album = root.join("album");
        fs::create_dir_all(album.join("disc2")).expect("dirs");
        fs::write(album.join("a.mp3"), b"abc").expect("write");
        fs::write(album.join("disc2").join("b.mp3"), b"defg").expect("write");

        let info = OsFilesystem.inspect_target(&album);
        assert!(info.is_folder);
        assert_eq!(info.size, 7);
        assert_eq!(info.file_count, 2);
    }

    #[test]
    fn listing_recurses_and_skips_folders() {
        let (_dir, root) = canonical_root();
        fs::create_dir_all(root.join("a").join("b")).expect("dirs");
        fs::write(root.join("top.lnk"), b"").expect("write");
        fs::write(root.join("a").join("b").join("deep.lnk"), b"").expect("write");

        let mut files = OsFilesystem.list_files(&root);
        files.sort();

        assert_eq!(
            files,
            vec![root.join("a").join("b").join("deep.lnk"), root.join("top.lnk")]
        );
    }

    #[test]
    fn copying_a_folder_target_recreates_its_tree() {
        let (_dir, root) = canonical_root();
        let source = root.join("src");
        fs::create_dir_all(source.join("inner")).expect("dirs");
        fs::write(source.join("inner").join("x.txt"), b"xyz").expect("write");

        let destination = root.join("dst");
        let copied = OsFilesystem.copy_target(&source, &destination).expect("copy");

        assert_eq!(copied, 3);
        assert_eq!(
            fs::read(destination.join("inner").join("x.txt")).expect("read"),
            b"xyz"
        );
    }

    #[cfg(unix)]
    #[test]
    fn path_through_a_link_is_a_canonical_mismatch() {
        let (_dir, root) = canonical_root();
        let real = root.join("real");
        fs::create_dir_all(&real).expect("dir");
        fs::write(real.join("file.txt"), b"x").expect("write");
        std::os::unix::fs::symlink(&real, root.join("alias")).expect("symlink");

        let info = OsFilesystem.inspect_target(&root.join("alias").join("file.txt"));
        assert_eq!(info.availability, Availability::AvailableCaseMismatch);
    }

    #[test]
    fn free_space_is_reported_for_a_real_folder() {
        let (_dir, root) = canonical_root();

        let available = OsFilesystem.free_space(&root).expect("free space");
        assert!(available > 0);
    }

    #[cfg(unix)]
    #[test]
    fn free_space_of_a_missing_folder_is_an_error() {
        let (_dir, root) = canonical_root();
        assert!(OsFilesystem.free_space(&root.join("absent")).is_err());
    }
}
