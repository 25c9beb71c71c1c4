//! Reconciliation of new shell files against the project tree.
//!
//! Both sync modes funnel into the same per-file loop; they differ only in
//! where candidates come from. Synchronization is additive: files missing
//! from the new set are never deleted. A failure stops the loop and leaves
//! already-written files in place.

use std::path::Path;

use pilet_core::{OverwritePolicy, Reporter, ScaffoldFile, ShellName, SyncMode};

use crate::conflict::ConflictPrompt;
use crate::diff::unified_diff;
use crate::error::{io_err, SyncError};
use crate::paths::emulator_cache_dir;
use crate::snapshot::{content_hash, FileSnapshot};
use crate::source::{eligible_files, emulator_sources, scaffold_sources, SourceFile};
use crate::writer::{atomic_copy, decide, Decision, FileAction, FileOutcome, FileState, SkipReason};

/// Everything [`reconcile`] needs besides its capabilities.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileRequest<'a> {
    pub mode: SyncMode,
    pub root: &'a Path,
    pub shell: &'a ShellName,
    /// Installed location of the new shell package.
    pub package_dir: &'a Path,
    /// Scaffold descriptors of the new shell (scaffolding mode only).
    pub files: &'a [ScaffoldFile],
    pub policy: OverwritePolicy,
    pub snapshot: &'a FileSnapshot,
}

/// Per-file outcomes of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub outcomes: Vec<FileOutcome>,
}

impl ReconcileReport {
    pub fn count(&self, pred: impl Fn(&FileAction) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.action)).count()
    }

    /// Files created or replaced.
    pub fn written(&self) -> usize {
        self.count(|a| matches!(a, FileAction::Created | FileAction::Replaced))
    }

    pub fn skipped(&self) -> usize {
        self.count(|a| matches!(a, FileAction::Skipped(_)))
    }
}

/// Reconcile the new shell's files into `request.root`.
pub fn reconcile(
    request: ReconcileRequest<'_>,
    prompt: &dyn ConflictPrompt,
    reporter: &dyn Reporter,
) -> Result<ReconcileReport, SyncError> {
    let sources = match request.mode {
        SyncMode::Emulator => {
            let cache = emulator_cache_dir(request.root, request.shell.as_str());
            emulator_sources(request.package_dir, &cache)?
        }
        SyncMode::Scaffolding => {
            let eligible = eligible_files(request.files, request.root);
            scaffold_sources(request.package_dir, &eligible, reporter)?
        }
    };
    tracing::debug!(mode = %request.mode, candidates = sources.len(), "reconciling files");

    let mut report = ReconcileReport::default();
    for source in &sources {
        let action = sync_file(&request, source, prompt)?;
        reporter.debug(&format!("{}: {}", source.target.display(), describe(action)));
        report.outcomes.push(FileOutcome {
            path: source.target.clone(),
            action,
        });
    }
    Ok(report)
}

fn sync_file(
    request: &ReconcileRequest<'_>,
    source: &SourceFile,
    prompt: &dyn ConflictPrompt,
) -> Result<FileAction, SyncError> {
    let target = request.root.join(&source.target);
    let incoming = std::fs::read(&source.origin).map_err(|e| io_err(&source.origin, e))?;
    let current = match std::fs::read(&target) {
        Ok(contents) => Some(contents),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(io_err(&target, err)),
    };

    let current_hash = current.as_deref().map(content_hash);
    let state = FileState {
        current: current_hash.as_deref(),
        identical: current.as_deref() == Some(incoming.as_slice()),
        snapshot: request
            .snapshot
            .get(&source.target)
            .map(|entry| entry.sha256.as_str()),
        once: source.once,
    };

    let action = match decide(state, request.policy) {
        Decision::Keep(action) => return Ok(action),
        Decision::Write(action) => action,
        Decision::Ask => {
            let diff = unified_diff(
                &source.target,
                current.as_deref().unwrap_or_default(),
                &incoming,
            );
            if !prompt.confirm_overwrite(&source.target, &diff)? {
                return Ok(FileAction::Skipped(SkipReason::Declined));
            }
            FileAction::Replaced
        }
    };

    atomic_copy(&source.origin, &target, &incoming)?;
    tracing::debug!("{}: {}", describe(action), target.display());
    Ok(action)
}

fn describe(action: FileAction) -> &'static str {
    match action {
        FileAction::Created => "created",
        FileAction::Replaced => "replaced",
        FileAction::Unchanged => "unchanged",
        FileAction::Skipped(SkipReason::Once) => "kept (place-once)",
        FileAction::Skipped(SkipReason::Customized) => "kept (modified locally)",
        FileAction::Skipped(SkipReason::Declined) => "kept (declined)",
    }
}
