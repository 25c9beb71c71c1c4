//! Error types for pilet-sync.

use std::path::PathBuf;

use thiserror::Error;

use pilet_core::ManifestError;
use pilet_detector::DetectError;

/// All errors that can arise from snapshotting or reconciling files.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tarball could not be read or unpacked.
    #[error("archive error in {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A descriptor or archive entry points outside the project root.
    #[error("refusing to write outside the project: {path}")]
    UnsafePath { path: PathBuf },

    /// The shell package manifest could not be read.
    #[error("shell manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Locating the installed shell package failed.
    #[error("detection error: {0}")]
    Detect(#[from] DetectError),

    /// The interactive prompt could not be answered.
    #[error("prompt failed for {path}: {source}")]
    Prompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// The file or directory the error is about, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            SyncError::Io { path, .. }
            | SyncError::Archive { path, .. }
            | SyncError::UnsafePath { path }
            | SyncError::Prompt { path, .. } => Some(path),
            SyncError::Manifest(_) | SyncError::Detect(_) => None,
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Archive`].
pub(crate) fn archive_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Archive {
        path: path.into(),
        source,
    }
}
