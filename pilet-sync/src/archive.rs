//! Reading the scaffold tarballs bundled in emulator packages.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tar::Archive;

use crate::error::{archive_err, io_err, SyncError};
use crate::paths::safe_relative;
use crate::snapshot::{content_hash, SnapshotEntry};

/// Unpack every regular file of `tar_path` below `dest`.
///
/// Returns the relative paths that were written. Directories are created as
/// needed; links and other special entries are ignored.
pub fn extract(tar_path: &Path, dest: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let file = File::open(tar_path).map_err(|e| io_err(tar_path, e))?;
    let mut archive = Archive::new(file);
    let mut extracted = Vec::new();

    for entry in archive.entries().map_err(|e| archive_err(tar_path, e))? {
        let mut entry = entry.map_err(|e| archive_err(tar_path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let raw = entry.path().map_err(|e| archive_err(tar_path, e))?.into_owned();
        let relative = safe_relative(&raw)?;
        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        entry.unpack(&target).map_err(|e| archive_err(tar_path, e))?;
        extracted.push(relative);
    }

    tracing::debug!(
        archive = %tar_path.display(),
        files = extracted.len(),
        "extracted emulator files"
    );
    Ok(extracted)
}

/// Hash every regular file of `tar_path` without unpacking it.
pub fn hash_entries(tar_path: &Path) -> Result<Vec<(PathBuf, SnapshotEntry)>, SyncError> {
    let file = File::open(tar_path).map_err(|e| io_err(tar_path, e))?;
    let mut archive = Archive::new(file);
    let mut hashes = Vec::new();

    for entry in archive.entries().map_err(|e| archive_err(tar_path, e))? {
        let mut entry = entry.map_err(|e| archive_err(tar_path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let raw = entry.path().map_err(|e| archive_err(tar_path, e))?.into_owned();
        let relative = safe_relative(&raw)?;
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| archive_err(tar_path, e))?;
        hashes.push((
            relative,
            SnapshotEntry {
                sha256: content_hash(&contents),
                size: contents.len() as u64,
            },
        ));
    }
    Ok(hashes)
}
