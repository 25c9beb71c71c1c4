//! Pilet core library — domain types, manifest access, errors, reporting.
//!
//! - [`types`] — newtypes, enums, shell package metadata
//! - [`manifest`] — read / validate / patch `package.json`
//! - [`error`] — [`ManifestError`]
//! - [`reporter`] — the [`Reporter`] capability

pub mod error;
pub mod manifest;
pub mod reporter;
pub mod types;

pub use error::ManifestError;
pub use manifest::{read_shell_package, PiletManifest, MANIFEST_FILE};
pub use reporter::{MemoryReporter, NullReporter, ReportEvent, Reporter, TracingReporter};
pub use types::{
    MonorepoKind, NpmClient, OverwritePolicy, PackageRef, PiletsInfo, PiralCliInfo, ScaffoldEntry,
    ScaffoldFile, ShellName, ShellPackageInfo, ShellReference, SyncMode, Topology,
};
