//! Project-layout detection for `pilet-detector`.
//!
//! Three questions are answered by inspecting indicator files:
//!
//! - [`detect_topology`]: is the pilet part of a monorepo, and which tool
//!   drives it? Checked from the project root upwards; the nearest directory
//!   with a marker wins.
//! - [`determine_npm_client`]: which package manager owns the project?
//!   An explicit preference wins over lockfile detection.
//! - [`find_monorepo_package`]: is a dependency a sibling workspace package
//!   rather than something fetched from a registry?

use std::path::{Component, Path, PathBuf};
use std::fs;

use pilet_core::{MonorepoKind, NpmClient, Topology, MANIFEST_FILE};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Errors from layout detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DetectError {
    DetectError::Io {
        path: path.into(),
        source,
    }
}

/// Lockfiles in detection priority order.
const LOCKFILES: &[(&str, NpmClient)] = &[
    ("package-lock.json", NpmClient::Npm),
    ("yarn.lock", NpmClient::Yarn),
    ("pnpm-lock.yaml", NpmClient::Pnpm),
    ("bun.lockb", NpmClient::Bun),
    ("bun.lock", NpmClient::Bun),
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Detect whether `root` lives inside a monorepo.
pub fn detect_topology(root: &Path) -> Result<Topology, DetectError> {
    for dir in root.ancestors() {
        if let Some(kind) = monorepo_marker(dir)? {
            tracing::debug!(root = %dir.display(), %kind, "monorepo detected");
            return Ok(Topology::Monorepo {
                kind,
                root: dir.to_path_buf(),
            });
        }
    }
    Ok(Topology::Single)
}

/// Pick the npm client for `root`.
///
/// Priority: explicit `preference`, then the nearest lockfile walking up from
/// `root`, then npm.
pub fn determine_npm_client(root: &Path, preference: Option<NpmClient>) -> NpmClient {
    if let Some(client) = preference {
        return client;
    }
    for dir in root.ancestors() {
        for (lockfile, client) in LOCKFILES {
            if dir.join(lockfile).is_file() {
                tracing::debug!(lockfile = %dir.join(lockfile).display(), "npm client detected");
                return *client;
            }
        }
    }
    NpmClient::default()
}

/// Resolve `name` the way node does: the first `node_modules/<name>` with a
/// `package.json`, walking up from `start`.
pub fn find_installed_package(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("node_modules").join(name))
        .find(|candidate| candidate.join(MANIFEST_FILE).is_file())
}

/// If `name` resolves (from `base_dir`) to a workspace sibling, return the
/// real directory of that package.
///
/// A package counts as monorepo-local when its canonical location is outside
/// every `node_modules` directory, i.e. the `node_modules` entry is a link
/// created by the workspace tool.
pub fn find_monorepo_package(name: &str, base_dir: &Path) -> Result<Option<PathBuf>, DetectError> {
    let Some(installed) = find_installed_package(base_dir, name) else {
        return Ok(None);
    };
    let real = fs::canonicalize(&installed).map_err(|e| io_err(&installed, e))?;
    let inside_node_modules = real
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part == "node_modules"));
    if inside_node_modules {
        Ok(None)
    } else {
        tracing::debug!(package = name, path = %real.display(), "monorepo-local package");
        Ok(Some(real))
    }
}

/// `find_monorepo_package` as a yes/no answer.
pub fn is_monorepo_member(name: &str, base_dir: &Path) -> Result<bool, DetectError> {
    Ok(find_monorepo_package(name, base_dir)?.is_some())
}

// ---------------------------------------------------------------------------
// Marker detection
// ---------------------------------------------------------------------------

fn monorepo_marker(dir: &Path) -> Result<Option<MonorepoKind>, DetectError> {
    if dir.join("lerna.json").is_file() {
        return Ok(Some(MonorepoKind::Lerna));
    }
    if dir.join("rush.json").is_file() {
        return Ok(Some(MonorepoKind::Rush));
    }
    if dir.join("pnpm-workspace.yaml").is_file() {
        return Ok(Some(MonorepoKind::Pnpm));
    }
    if declares_workspaces(dir)? {
        return Ok(Some(MonorepoKind::Workspaces));
    }
    Ok(None)
}

fn declares_workspaces(dir: &Path) -> Result<bool, DetectError> {
    let file = dir.join(MANIFEST_FILE);
    if !file.is_file() {
        return Ok(false);
    }
    let content = fs::read_to_string(&file).map_err(|e| io_err(&file, e))?;
    let json: serde_json::Value = match serde_json::from_str(&content) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(path = %file.display(), "ignoring unparseable package.json: {e}");
            return Ok(false);
        }
    };

    // npm/yarn accept an array, yarn classic also `{ "packages": [...] }`.
    Ok(match json.get("workspaces") {
        Some(serde_json::Value::Array(globs)) => !globs.is_empty(),
        Some(serde_json::Value::Object(obj)) => obj
            .get("packages")
            .and_then(|p| p.as_array())
            .is_some_and(|p| !p.is_empty()),
        _ => false,
    })
}
