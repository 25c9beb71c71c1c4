//! Domain types for the pilet upgrade pipeline.
//!
//! Everything the pipeline branches on (policy, client, topology, sync mode)
//! is a closed enum resolved once and carried as state.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed npm package name for the app shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShellName(pub String);

impl ShellName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShellName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ShellName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ShellName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// An installable package reference: `name@selector`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: ShellName,
    pub selector: String,
}

impl PackageRef {
    pub fn new(name: ShellName, selector: impl Into<String>) -> Self {
        Self {
            name,
            selector: selector.into(),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.selector)
    }
}

// ---------------------------------------------------------------------------
// Shell reference
// ---------------------------------------------------------------------------

/// The validated app-shell reference of a pilet.
///
/// Only constructed by [`crate::manifest::PiletManifest::shell_reference`],
/// so both fields are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellReference {
    pub name: ShellName,
    /// The constraint currently recorded in `devDependencies`.
    pub version: String,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How conflicting (user-customized) files are treated during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Keep customized files.
    #[default]
    No,
    /// Always replace with the new template.
    Yes,
    /// Ask for every conflicting file.
    Prompt,
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverwritePolicy::No => write!(f, "no"),
            OverwritePolicy::Yes => write!(f, "yes"),
            OverwritePolicy::Prompt => write!(f, "prompt"),
        }
    }
}

impl FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "no" | "false" => Ok(Self::No),
            "yes" | "true" => Ok(Self::Yes),
            "prompt" => Ok(Self::Prompt),
            other => Err(format!(
                "unknown overwrite policy '{other}'; expected: no, yes, prompt"
            )),
        }
    }
}

/// The package-manager client used for every install in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NpmClient {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl NpmClient {
    /// Executable name of the client.
    pub fn command(self) -> &'static str {
        match self {
            NpmClient::Npm => "npm",
            NpmClient::Yarn => "yarn",
            NpmClient::Pnpm => "pnpm",
            NpmClient::Bun => "bun",
        }
    }

    /// Subcommand that installs a single named package.
    pub fn add_subcommand(self) -> &'static str {
        match self {
            NpmClient::Npm => "install",
            NpmClient::Yarn | NpmClient::Pnpm | NpmClient::Bun => "add",
        }
    }
}

impl fmt::Display for NpmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for NpmClient {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "yarn" => Ok(Self::Yarn),
            "pnpm" => Ok(Self::Pnpm),
            "bun" => Ok(Self::Bun),
            other => Err(format!(
                "unknown npm client '{other}'; expected: npm, yarn, pnpm, bun"
            )),
        }
    }
}

/// Monorepo tooling detected around a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonorepoKind {
    Lerna,
    Rush,
    Pnpm,
    /// npm / yarn / bun `workspaces` field in a root `package.json`.
    Workspaces,
}

impl fmt::Display for MonorepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonorepoKind::Lerna => write!(f, "lerna"),
            MonorepoKind::Rush => write!(f, "rush"),
            MonorepoKind::Pnpm => write!(f, "pnpm"),
            MonorepoKind::Workspaces => write!(f, "workspaces"),
        }
    }
}

/// Repository topology of the pilet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    Single,
    Monorepo { kind: MonorepoKind, root: PathBuf },
}

impl Topology {
    pub fn is_monorepo(&self) -> bool {
        matches!(self, Topology::Monorepo { .. })
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Single => write!(f, "single"),
            Topology::Monorepo { kind, .. } => write!(f, "monorepo ({kind})"),
        }
    }
}

/// Where scaffold files are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Files come from the tarballs bundled in an emulator package.
    Emulator,
    /// Files come from the installed shell package tree.
    Scaffolding,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Emulator => write!(f, "emulator"),
            SyncMode::Scaffolding => write!(f, "scaffolding"),
        }
    }
}

// ---------------------------------------------------------------------------
// Shell package info
// ---------------------------------------------------------------------------

/// A scaffold file declared by the shell in `pilets.files`.
///
/// Either a bare relative path or a structured entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaffoldFile {
    Path(String),
    Entry(ScaffoldEntry),
}

/// Structured form of a [`ScaffoldFile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldEntry {
    /// Path inside the shell package.
    #[serde(alias = "from")]
    pub path: String,
    /// Destination inside the pilet; defaults to `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Only place when absent; never overwrite afterwards.
    #[serde(default)]
    pub once: bool,
}

impl ScaffoldFile {
    pub fn source(&self) -> &str {
        match self {
            ScaffoldFile::Path(p) => p,
            ScaffoldFile::Entry(e) => &e.path,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            ScaffoldFile::Path(p) => p,
            ScaffoldFile::Entry(e) => e.to.as_deref().unwrap_or(&e.path),
        }
    }

    pub fn once(&self) -> bool {
        match self {
            ScaffoldFile::Path(_) => false,
            ScaffoldFile::Entry(e) => e.once,
        }
    }
}

impl From<&str> for ScaffoldFile {
    fn from(s: &str) -> Self {
        ScaffoldFile::Path(s.to_owned())
    }
}

/// `piralCLI` block of a shell package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiralCliInfo {
    #[serde(default)]
    pub generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// `pilets` block of a shell package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiletsInfo {
    #[serde(default)]
    pub files: Vec<ScaffoldFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_upgrade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_upgrade: Option<String>,
}

/// Metadata of an installed shell package (its own `package.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellPackageInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, rename = "piralCLI", skip_serializing_if = "Option::is_none")]
    pub piral_cli: Option<PiralCliInfo>,
    #[serde(default)]
    pub pilets: PiletsInfo,
}

impl ShellPackageInfo {
    /// Emulator packages are marked `piralCLI.generated = true`.
    pub fn is_emulator(&self) -> bool {
        self.piral_cli.as_ref().is_some_and(|cli| cli.generated)
    }

    pub fn sync_mode(&self) -> SyncMode {
        if self.is_emulator() {
            SyncMode::Emulator
        } else {
            SyncMode::Scaffolding
        }
    }

    /// Pre-upgrade hook, ignoring blank commands.
    pub fn pre_upgrade(&self) -> Option<&str> {
        non_blank(self.pilets.pre_upgrade.as_deref())
    }

    /// Post-upgrade hook, ignoring blank commands.
    pub fn post_upgrade(&self) -> Option<&str> {
        non_blank(self.pilets.post_upgrade.as_deref())
    }
}

fn non_blank(command: Option<&str>) -> Option<&str> {
    command.filter(|c| !c.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
