use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ResolveError;
use crate::paths::normalize_lexically;

/// Reads the target a shortcut points at. Must not modify anything.
pub trait ShortcutResolver: Send {
    fn resolve(&self, shortcut: &Path) -> Result<PathBuf, ResolveError>;
}

/// Recreates the shortcut at `shortcut` so it points at `target`, replacing the old one.
pub trait ShortcutWriter: Send {
    fn write(&self, target: &Path, shortcut: &Path) -> io::Result<()>;
}

/// Shortcuts stored as filesystem symbolic links.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinkShortcuts;

fn map_error(error: io::Error) -> io::Error {
    if error.raw_os_error() == Some(1314) {
        return io::Error::new(
            io::ErrorKind::PermissionDenied,
            "SeCreateSymbolicLinkPrivilege is required. Enable Developer Mode in Windows Settings or run as Administrator.",
        );
    }

    error
}

fn resolve_target(link_path: &Path, target: PathBuf) -> PathBuf {
    if target.is_absolute() {
        normalize_lexically(&target)
    } else {
        normalize_lexically(
            &link_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(target),
        )
    }
}

#[cfg(unix)]
fn create_link(target: &Path, link_path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link_path)
}

#[cfg(windows)]
fn create_link(target: &Path, link_path: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link_path)
    } else {
        std::os::windows::fs::symlink_file(target, link_path)
    }
}

fn staging_path(link_path: &Path) -> io::Result<PathBuf> {
    let name = link_path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Shortcut path has no file name"))?;

    let mut staged = std::ffi::OsString::from(".");
    staged.push(name);
    staged.push(".lnkview-tmp");
    Ok(link_path.with_file_name(staged))
}

impl ShortcutResolver for SymlinkShortcuts {
    fn resolve(&self, shortcut: &Path) -> Result<PathBuf, ResolveError> {
        let metadata = fs::symlink_metadata(shortcut)?;

        if !metadata.file_type().is_symlink() {
            return Err(ResolveError::NotAShortcut {
                path: shortcut.to_path_buf(),
            });
        }

        let stored = fs::read_link(shortcut)?;
        if stored.as_os_str().is_empty() {
            return Err(ResolveError::EmptyTarget);
        }

        Ok(resolve_target(shortcut, stored))
    }
}

impl ShortcutWriter for SymlinkShortcuts {
    fn write(&self, target: &Path, shortcut: &Path) -> io::Result<()> {
        let staged = staging_path(shortcut)?;

        if fs::symlink_metadata(&staged).is_ok() {
            fs::remove_file(&staged)?;
        }

        create_link(target, &staged).map_err(map_error)?;

        if let Err(error) = fs::rename(&staged, shortcut) {
            let _ = fs::remove_file(&staged);
            return Err(map_error(error));
        }

        Ok(())
    }
}
