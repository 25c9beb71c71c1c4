//! Error taxonomy of the upgrade pipeline.

use std::path::{Path, PathBuf};

use thiserror::Error;

use pilet_core::ManifestError;
use pilet_detector::DetectError;
use pilet_sync::SyncError;

/// Every way an upgrade can fail. All variants are terminal.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// The target path is missing or not a directory.
    #[error("target {path} does not exist or is not a directory")]
    InvalidTarget { path: PathBuf },

    /// The manifest has no `piral` section.
    #[error("{path} is not a pilet manifest: missing \"piral\" section")]
    NotAPiletProject { path: PathBuf },

    /// `piral.name` is malformed.
    #[error("{path} declares an invalid app shell: \"piral.name\" must be a non-empty string")]
    InvalidShellPackage { path: PathBuf },

    /// The shell's version constraint is malformed or missing.
    #[error("app shell \"{name}\" has no valid version constraint in devDependencies")]
    InvalidShellReference { name: String },

    /// Reading or writing the pilet manifest failed.
    #[error("manifest error: {0}")]
    Manifest(ManifestError),

    /// Inspecting the project layout failed.
    #[error("detection error: {0}")]
    Detect(#[from] DetectError),

    /// The registry could not resolve the requested version.
    #[error("could not resolve {reference}: {message}")]
    RegistryResolution { reference: String, message: String },

    /// Reconciling files failed at `path`.
    #[error("failed to synchronize {path}: {source}")]
    FileSync {
        path: PathBuf,
        #[source]
        source: SyncError,
    },

    /// A lifecycle hook exited unsuccessfully.
    #[error("hook `{command}` failed ({})", exit_label(.code))]
    HookExecution { command: String, code: Option<i32> },

    /// A package-manager invocation failed.
    #[error("`{command}` failed: {message}")]
    DependencyInstall { command: String, message: String },
}

impl UpgradeError {
    /// Name of the pipeline phase that produced the error.
    pub fn phase(&self) -> &'static str {
        match self {
            UpgradeError::InvalidTarget { .. } => "validate target",
            UpgradeError::NotAPiletProject { .. }
            | UpgradeError::InvalidShellPackage { .. }
            | UpgradeError::InvalidShellReference { .. }
            | UpgradeError::Manifest(_) => "manifest",
            UpgradeError::Detect(_) => "detect project layout",
            UpgradeError::RegistryResolution { .. } => "resolve version",
            UpgradeError::FileSync { .. } => "synchronize files",
            UpgradeError::HookExecution { .. } => "run hook",
            UpgradeError::DependencyInstall { .. } => "install dependencies",
        }
    }

    /// Wrap a sync error, falling back to `root` when it carries no path.
    pub(crate) fn file_sync(root: &Path, source: SyncError) -> Self {
        let path = source.path().unwrap_or(root).to_path_buf();
        UpgradeError::FileSync { path, source }
    }
}

impl From<ManifestError> for UpgradeError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::NotAPiletProject { path } => UpgradeError::NotAPiletProject { path },
            ManifestError::InvalidShellPackage { path } => {
                UpgradeError::InvalidShellPackage { path }
            }
            ManifestError::InvalidShellReference { name } => {
                UpgradeError::InvalidShellReference { name }
            }
            other => UpgradeError::Manifest(other),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated without exit code".to_string(),
    }
}
