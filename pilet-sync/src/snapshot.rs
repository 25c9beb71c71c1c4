//! File snapshot — SHA-256 record of what the currently installed shell
//! provided, taken before anything new is installed.
//!
//! Reconciliation compares a project file against its snapshot entry: a
//! match means the file still holds the shell's previous template content
//! and may be replaced; a mismatch means the user edited it.
//!
//! Hashes normalise CRLF to LF so a checkout with converted line endings
//! still counts as unmodified.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use pilet_core::{read_shell_package, NullReporter, ShellName};
use pilet_detector::find_installed_package;

use crate::archive;
use crate::error::{io_err, SyncError};
use crate::paths::{key_of, EMULATOR_FILES_TAR, EMULATOR_ONCE_TAR};
use crate::source::scaffold_sources;

/// Hash and size of one shell-provided file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub sha256: String,
    pub size: u64,
}

/// Snapshot of the previous shell version's files, keyed by `/`-separated
/// destination path relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// `name@version` of the shell the snapshot was taken from.
    pub shell: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub files: BTreeMap<String, SnapshotEntry>,
}

impl FileSnapshot {
    pub fn empty() -> Self {
        Self {
            shell: None,
            captured_at: Utc::now(),
            files: BTreeMap::new(),
        }
    }

    pub fn get(&self, relative: &Path) -> Option<&SnapshotEntry> {
        self.files.get(&key_of(relative))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Capture the snapshot for `shell_name` as currently installed below `root`.
///
/// Returns an empty snapshot when the shell is not installed.
pub fn capture(root: &Path, shell_name: &ShellName) -> Result<FileSnapshot, SyncError> {
    let Some(package_dir) = find_installed_package(root, shell_name.as_str()) else {
        tracing::debug!(shell = %shell_name, "shell not installed; empty snapshot");
        return Ok(FileSnapshot::empty());
    };
    let info = read_shell_package(&package_dir)?;
    let mut snapshot = FileSnapshot::empty();
    snapshot.shell = Some(match &info.version {
        Some(version) => format!("{}@{}", info.name, version),
        None => info.name.clone(),
    });

    if info.is_emulator() {
        for tar_name in [EMULATOR_FILES_TAR, EMULATOR_ONCE_TAR] {
            let tar_path = package_dir.join(tar_name);
            if !tar_path.is_file() {
                continue;
            }
            for (relative, entry) in archive::hash_entries(&tar_path)? {
                snapshot.files.insert(key_of(&relative), entry);
            }
        }
    } else {
        let all: Vec<_> = info.pilets.files.iter().collect();
        for source in scaffold_sources(&package_dir, &all, &NullReporter)? {
            let contents = std::fs::read(&source.origin).map_err(|e| io_err(&source.origin, e))?;
            snapshot.files.insert(
                key_of(&source.target),
                SnapshotEntry {
                    sha256: content_hash(&contents),
                    size: contents.len() as u64,
                },
            );
        }
    }

    tracing::debug!(
        shell = snapshot.shell.as_deref().unwrap_or_default(),
        files = snapshot.len(),
        "captured file snapshot"
    );
    Ok(snapshot)
}

/// SHA-256 hex digest of `contents`. CRLF is normalised to LF for UTF-8
/// text; anything else is hashed as-is.
pub fn content_hash(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    if std::str::from_utf8(contents).is_err() {
        hasher.update(contents);
        return hex::encode(hasher.finalize());
    }
    let mut start = 0;
    for (i, pair) in contents.windows(2).enumerate() {
        if pair == b"\r\n" {
            hasher.update(&contents[start..i]);
            start = i + 1;
        }
    }
    hasher.update(&contents[start..]);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
