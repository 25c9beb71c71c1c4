//! The upgrade pipeline.
//!
//! ## Steps (strictly ordered, first failure aborts)
//!
//! 1. Validate the target directory and make it absolute.
//! 2. Pick the npm client.
//! 3. Read the pilet manifest.
//! 4. Validate the app-shell reference.
//! 5. Resolve the target version and the project topology.
//! 6. Snapshot the files the installed shell owns.
//! 7. Install the new shell with `--no-save` (not for monorepo siblings).
//! 8. Read the new shell's metadata and pick the sync mode.
//! 9. Run the `preUpgrade` hook.
//! 10. Record the new version in `devDependencies`.
//! 11. Reconcile template files.
//! 12. Reinstall dependencies (or bootstrap the monorepo).
//! 13. Run the `postUpgrade` hook.
//! 14. Drop the transient cache under `node_modules/.cache/piral`.
//! 15. Signal completion.
//!
//! Nothing is rolled back on failure: files written before the failing step
//! stay written.

use std::path::{Path, PathBuf};

use pilet_core::{
    read_shell_package, NpmClient, OverwritePolicy, PiletManifest, Reporter, ShellName,
    ShellReference, SyncMode, Topology,
};
use pilet_detector::{detect_topology, determine_npm_client, find_installed_package};
use pilet_sync::{cache_root, capture, reconcile, ConflictPrompt, ReconcileReport, ReconcileRequest, SyncError};

use crate::error::UpgradeError;
use crate::hooks::{run_hook, HookStage};
use crate::resolver::{resolve, ResolvedShell};
use crate::toolchain::{InstallFlags, Toolchain};

/// Caller-supplied knobs for one upgrade.
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    /// Pilet directory, relative to the base directory.
    pub target: PathBuf,
    /// Requested version, dist-tag, or range. `None` means latest.
    pub version: Option<String>,
    pub policy: OverwritePolicy,
    /// Reinstall the dependency tree after patching.
    pub install: bool,
    /// Forced npm client; detected from lockfiles when `None`.
    pub npm_client: Option<NpmClient>,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            target: PathBuf::from("."),
            version: None,
            policy: OverwritePolicy::No,
            install: true,
            npm_client: None,
        }
    }
}

/// The side-effecting capabilities the pipeline works through.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub toolchain: &'a dyn Toolchain,
    pub prompt: &'a dyn ConflictPrompt,
    pub reporter: &'a dyn Reporter,
}

/// Summary of a successful upgrade.
#[derive(Debug, Clone)]
pub struct UpgradeReport {
    pub root: PathBuf,
    pub npm_client: NpmClient,
    pub shell: ShellName,
    /// Constraint recorded before the upgrade.
    pub previous: String,
    pub resolved: ResolvedShell,
    pub mode: SyncMode,
    pub topology: Topology,
    pub files: ReconcileReport,
    pub hooks_run: Vec<HookStage>,
    /// Whether the dependency tree was reinstalled.
    pub installed: bool,
}

/// Upgrade the pilet at `base_dir/options.target` to a newer app shell.
pub fn upgrade_pilet(
    base_dir: &Path,
    options: &UpgradeOptions,
    caps: Capabilities<'_>,
) -> Result<UpgradeReport, UpgradeError> {
    let Capabilities {
        toolchain,
        prompt,
        reporter,
    } = caps;

    let candidate = base_dir.join(&options.target);
    if !candidate.is_dir() {
        return Err(UpgradeError::InvalidTarget { path: candidate });
    }
    // Ancestor walks need an absolute root.
    let root = std::fs::canonicalize(&candidate)
        .map_err(|_| UpgradeError::InvalidTarget { path: candidate })?;

    let npm_client = determine_npm_client(&root, options.npm_client);
    reporter.debug(&format!("Using npm client: {npm_client}"));

    let mut manifest = PiletManifest::read(&root)?;
    let shell = manifest.shell_reference()?;
    reporter.debug(&format!("Found app shell {}@{}", shell.name, shell.version));

    let resolved = resolve(toolchain, base_dir, &shell, options.version.as_deref(), &root)?;
    let topology = detect_topology(&root)?;
    reporter.debug(&format!("Project topology: {topology}"));

    let snapshot = capture(&root, &shell.name).map_err(|e| UpgradeError::file_sync(&root, e))?;
    reporter.debug(&format!("Captured {} shell-owned file(s)", snapshot.len()));

    if resolved.is_monorepo_local() {
        reporter.debug(&format!(
            "{} is a monorepo package, skipping installation",
            shell.name
        ));
    } else {
        reporter.progress(&format!("Updating NPM package to {} ...", resolved.package_ref));
        toolchain.install_package(npm_client, &resolved.package_ref, &root, InstallFlags::NO_SAVE)?;
    }

    let package_dir = locate_shell(&root, &shell, &resolved)?;
    let info = read_shell_package(&package_dir)?;
    let mode = info.sync_mode();
    reporter.debug(&format!("Shell package at {} ({mode})", package_dir.display()));

    let mut hooks_run = Vec::new();
    if run_hook(toolchain, reporter, HookStage::PreUpgrade, info.pre_upgrade(), &root)? {
        hooks_run.push(HookStage::PreUpgrade);
    }

    manifest.set_shell_version(&shell.name, &resolved.version);
    manifest.save()?;

    reporter.progress("Taking care of templating ...");
    let files = reconcile(
        ReconcileRequest {
            mode,
            root: &root,
            shell: &shell.name,
            package_dir: &package_dir,
            files: &info.pilets.files,
            policy: options.policy,
            snapshot: &snapshot,
        },
        prompt,
        reporter,
    )
    .map_err(|e| UpgradeError::file_sync(&root, e))?;

    if options.install {
        reporter.progress("Updating dependencies ...");
        match &topology {
            Topology::Monorepo { kind, root: monorepo_root } => {
                toolchain.bootstrap_monorepo(npm_client, *kind, monorepo_root)?
            }
            Topology::Single => toolchain.install_all(npm_client, &root)?,
        }
    }

    if run_hook(toolchain, reporter, HookStage::PostUpgrade, info.post_upgrade(), &root)? {
        hooks_run.push(HookStage::PostUpgrade);
    }

    remove_cache(&root)?;
    reporter.done(&format!(
        "Pilet upgraded to {}@{}",
        shell.name, resolved.version
    ));

    Ok(UpgradeReport {
        root,
        npm_client,
        shell: shell.name,
        previous: shell.version,
        resolved,
        mode,
        topology,
        files,
        hooks_run,
        installed: options.install,
    })
}

fn locate_shell(
    root: &Path,
    shell: &ShellReference,
    resolved: &ResolvedShell,
) -> Result<PathBuf, UpgradeError> {
    if let Some(local) = &resolved.local_dir {
        return Ok(local.clone());
    }
    find_installed_package(root, shell.name.as_str()).ok_or_else(|| {
        UpgradeError::DependencyInstall {
            command: format!("install {}", resolved.package_ref),
            message: format!("{} is not present in node_modules afterwards", shell.name),
        }
    })
}

fn remove_cache(root: &Path) -> Result<(), UpgradeError> {
    let cache = cache_root(root);
    match std::fs::remove_dir_all(&cache) {
        Ok(()) => {
            tracing::debug!("removed {}", cache.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(UpgradeError::FileSync {
            path: cache.clone(),
            source: SyncError::Io {
                path: cache,
                source,
            },
        }),
    }
}
