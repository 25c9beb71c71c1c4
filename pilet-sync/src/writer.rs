//! Per-file overwrite decisions and atomic writes.
//!
//! ## Decision order
//!
//! 1. Target absent → create.
//! 2. Place-once file already present → skip.
//! 3. Target already holds the new bytes → unchanged.
//! 4. Target matches the snapshot (shell-owned, unmodified) → replace.
//! 5. Otherwise the user customized it → apply the overwrite policy.
//!
//! ## `atomic_copy`
//!
//! 1. Ensure the parent directory exists.
//! 2. Write to `<path>.pilet.tmp`.
//! 3. Copy the source permissions onto the temp file.
//! 4. Rename to the final path (atomic on POSIX).

use std::path::{Path, PathBuf};

use pilet_core::OverwritePolicy;
use serde::Serialize;

use crate::error::{io_err, SyncError};

/// Why a file was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// Place-once file that already exists.
    Once,
    /// User-modified file under the `no` policy.
    Customized,
    /// User-modified file the prompt declined.
    Declined,
}

/// What happened to one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "action", content = "reason")]
pub enum FileAction {
    Created,
    Replaced,
    Unchanged,
    Skipped(SkipReason),
}

/// Outcome for one destination path (relative to the project root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub action: FileAction,
}

/// Pure decision for one file; `Ask` defers to the conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Write(FileAction),
    Keep(FileAction),
    Ask,
}

/// Inputs to [`decide`].
#[derive(Debug, Clone, Copy)]
pub struct FileState<'a> {
    /// Hash of the file currently in the project, if it exists.
    pub current: Option<&'a str>,
    /// The project file is byte-for-byte the incoming content.
    pub identical: bool,
    /// Hash recorded for this path in the snapshot.
    pub snapshot: Option<&'a str>,
    pub once: bool,
}

/// Apply the decision order to one file.
pub fn decide(state: FileState<'_>, policy: OverwritePolicy) -> Decision {
    let Some(current) = state.current else {
        return Decision::Write(FileAction::Created);
    };
    if state.once {
        return Decision::Keep(FileAction::Skipped(SkipReason::Once));
    }
    if state.identical {
        return Decision::Keep(FileAction::Unchanged);
    }
    if state.snapshot == Some(current) {
        return Decision::Write(FileAction::Replaced);
    }
    match policy {
        OverwritePolicy::Yes => Decision::Write(FileAction::Replaced),
        OverwritePolicy::No => Decision::Keep(FileAction::Skipped(SkipReason::Customized)),
        OverwritePolicy::Prompt => Decision::Ask,
    }
}

/// Atomically replace `target` with `contents`, carrying over the
/// permissions of `origin`.
pub(crate) fn atomic_copy(origin: &Path, target: &Path, contents: &[u8]) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.pilet.tmp", target.display()));
    atomic_copy_with_tmp(origin, target, contents, &tmp)
}

fn atomic_copy_with_tmp(
    origin: &Path,
    target: &Path,
    contents: &[u8],
    tmp: &Path,
) -> Result<(), SyncError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    std::fs::write(tmp, contents).map_err(|e| io_err(tmp, e))?;
    copy_permissions(origin, tmp)?;

    if let Err(e) = std::fs::rename(tmp, target) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(target, e));
    }
    Ok(())
}

#[cfg(unix)]
fn copy_permissions(origin: &Path, tmp: &Path) -> Result<(), SyncError> {
    let meta = std::fs::metadata(origin).map_err(|e| io_err(origin, e))?;
    std::fs::set_permissions(tmp, meta.permissions()).map_err(|e| io_err(tmp, e))
}

#[cfg(not(unix))]
fn copy_permissions(_origin: &Path, _tmp: &Path) -> Result<(), SyncError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
