use std::path::{Component, Path, PathBuf};

use crate::error::SyncError;

/// Tarball with the regular scaffold files of an emulator package.
pub const EMULATOR_FILES_TAR: &str = "files.tar";
/// Tarball with the place-once scaffold files of an emulator package.
pub const EMULATOR_ONCE_TAR: &str = "files_once.tar";

/// Transient cache shared with the rest of the pilet tooling.
pub fn cache_root(root: &Path) -> PathBuf {
    root.join("node_modules").join(".cache").join("piral")
}

/// Extraction directory for one shell's emulator tarballs.
pub fn emulator_cache_dir(root: &Path, shell_name: &str) -> PathBuf {
    cache_root(root).join(shell_name)
}

/// Normalise a relative path from a descriptor or archive entry.
///
/// `.` components are dropped; absolute paths and `..` are rejected so
/// nothing can land outside the project root.
pub fn safe_relative(raw: &Path) -> Result<PathBuf, SyncError> {
    let mut out = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SyncError::UnsafePath {
                    path: raw.to_path_buf(),
                })
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(SyncError::UnsafePath {
            path: raw.to_path_buf(),
        });
    }
    Ok(out)
}

/// Snapshot / report key for a relative path: `/`-separated.
pub fn key_of(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
