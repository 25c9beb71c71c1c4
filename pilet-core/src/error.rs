//! Error types for pilet-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while reading, validating, or writing a
/// `package.json` manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Underlying I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load — includes the manifest path.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (write path).
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The manifest root is not a JSON object.
    #[error("{path} does not contain a JSON object")]
    NotAnObject { path: PathBuf },

    /// No `piral` block, or the block is not an object.
    #[error("{path} is not a pilet manifest: missing \"piral\" section")]
    NotAPiletProject { path: PathBuf },

    /// `piral.name` is missing, empty, or not a string.
    #[error("{path} declares an invalid app shell: \"piral.name\" must be a non-empty string")]
    InvalidShellPackage { path: PathBuf },

    /// `devDependencies[<shell>]` is missing, empty, or not a string.
    #[error("app shell \"{name}\" has no valid version constraint in devDependencies")]
    InvalidShellReference { name: String },
}

/// Convenience constructor for [`ManifestError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.into(),
        source,
    }
}
