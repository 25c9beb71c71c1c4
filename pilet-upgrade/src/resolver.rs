//! Decide which shell version a pilet upgrades to.

use std::path::{Path, PathBuf};

use semver::Version;

use pilet_core::{read_shell_package, PackageRef, ShellReference};
use pilet_detector::find_monorepo_package;

use crate::error::UpgradeError;
use crate::toolchain::Toolchain;

const NON_REGISTRY_PREFIXES: &[&str] = &[
    "file:", "link:", "git+", "git:", "http://", "https://", "github:",
];

/// Outcome of version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShell {
    /// What to hand to the package manager.
    pub package_ref: PackageRef,
    /// What to record in `devDependencies`.
    pub version: String,
    /// Real directory of the shell when it is a monorepo sibling.
    pub local_dir: Option<PathBuf>,
}

impl ResolvedShell {
    pub fn is_monorepo_local(&self) -> bool {
        self.local_dir.is_some()
    }
}

/// Resolve the target version of `shell`.
///
/// Order: monorepo sibling, explicit request, non-registry constraint kept
/// as-is, registry `latest`. Sibling lookup starts at `root`, then `base_dir`.
pub fn resolve(
    toolchain: &dyn Toolchain,
    base_dir: &Path,
    shell: &ShellReference,
    requested: Option<&str>,
    root: &Path,
) -> Result<ResolvedShell, UpgradeError> {
    let name = &shell.name;

    if let Some(local_dir) = monorepo_sibling(name.as_str(), root, base_dir)? {
        let info = read_shell_package(&local_dir)?;
        let version = info.version.unwrap_or_else(|| shell.version.clone());
        tracing::debug!(shell = %name, %version, "shell is a monorepo sibling");
        return Ok(ResolvedShell {
            package_ref: PackageRef::new(name.clone(), version.clone()),
            version,
            local_dir: Some(local_dir),
        });
    }

    let selector = match requested.map(str::trim).filter(|r| !r.is_empty()) {
        Some(requested) if is_exact_version(requested) => {
            return Ok(registry_pinned(shell, requested));
        }
        Some(requested) => requested,
        None if is_non_registry(&shell.version) => {
            tracing::debug!(shell = %name, source = %shell.version, "keeping non-registry source");
            return Ok(ResolvedShell {
                package_ref: PackageRef::new(name.clone(), shell.version.clone()),
                version: shell.version.clone(),
                local_dir: None,
            });
        }
        None => "latest",
    };

    let version = toolchain.resolve_registry_version(name, selector)?;
    tracing::debug!(shell = %name, selector, %version, "resolved from registry");
    Ok(registry_pinned(shell, &version))
}

fn monorepo_sibling(
    name: &str,
    root: &Path,
    base_dir: &Path,
) -> Result<Option<PathBuf>, UpgradeError> {
    if let Some(found) = find_monorepo_package(name, root)? {
        return Ok(Some(found));
    }
    if root == base_dir {
        return Ok(None);
    }
    Ok(find_monorepo_package(name, base_dir)?)
}

fn registry_pinned(shell: &ShellReference, version: &str) -> ResolvedShell {
    ResolvedShell {
        package_ref: PackageRef::new(shell.name.clone(), version),
        version: version.to_string(),
        local_dir: None,
    }
}

fn is_exact_version(selector: &str) -> bool {
    Version::parse(selector).is_ok()
}

/// Constraints that point somewhere other than the registry.
pub fn is_non_registry(constraint: &str) -> bool {
    NON_REGISTRY_PREFIXES
        .iter()
        .any(|prefix| constraint.starts_with(prefix))
}
