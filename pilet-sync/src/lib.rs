//! # pilet-sync
//!
//! File snapshot and overwrite engine.
//!
//! Call [`snapshot::capture`] before a new shell version is installed, then
//! [`reconcile`] afterwards to bring the new template files into the pilet
//! without clobbering local edits.

pub mod archive;
pub mod conflict;
pub mod diff;
pub mod error;
pub mod paths;
pub mod reconcile;
pub mod snapshot;
pub mod source;
pub mod writer;

pub use conflict::{ConflictPrompt, TerminalPrompt};
pub use error::SyncError;
pub use paths::cache_root;
pub use reconcile::{reconcile, ReconcileReport, ReconcileRequest};
pub use snapshot::{capture, FileSnapshot, SnapshotEntry};
pub use writer::{FileAction, FileOutcome, SkipReason};
