//! External tooling behind one trait: registry lookups, package-manager
//! invocations, and shell scripts.
//!
//! [`ProcessToolchain`] is the real implementation; tests substitute a fake
//! that records calls.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use pilet_core::{MonorepoKind, NpmClient, PackageRef, ShellName};

use crate::error::UpgradeError;
use crate::registry::NpmRegistry;

/// Extra switches for a targeted install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallFlags {
    /// Install without recording the package in the manifest.
    pub no_save: bool,
}

impl InstallFlags {
    pub const NO_SAVE: InstallFlags = InstallFlags { no_save: true };
}

/// Everything the pipeline needs from the outside world.
pub trait Toolchain {
    /// Turn `selector` (dist-tag, range, or version) into a concrete version.
    fn resolve_registry_version(
        &self,
        name: &ShellName,
        selector: &str,
    ) -> Result<String, UpgradeError>;

    /// Install one package into `root`.
    fn install_package(
        &self,
        client: NpmClient,
        package: &PackageRef,
        root: &Path,
        flags: InstallFlags,
    ) -> Result<(), UpgradeError>;

    /// Install the full dependency tree of `root`.
    fn install_all(&self, client: NpmClient, root: &Path) -> Result<(), UpgradeError>;

    /// Re-link a monorepo after one of its members changed.
    fn bootstrap_monorepo(
        &self,
        client: NpmClient,
        kind: MonorepoKind,
        monorepo_root: &Path,
    ) -> Result<(), UpgradeError>;

    /// Run a shell command in `cwd`.
    fn run_script(&self, command: &str, cwd: &Path) -> Result<(), UpgradeError>;
}

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn install_package_invocation(
    client: NpmClient,
    package: &PackageRef,
    flags: InstallFlags,
) -> Invocation {
    let reference = package.to_string();
    let mut args = vec![client.add_subcommand(), reference.as_str()];
    if flags.no_save {
        args.push("--no-save");
    }
    Invocation::new(client.command(), &args)
}

pub fn install_all_invocation(client: NpmClient) -> Invocation {
    Invocation::new(client.command(), &["install"])
}

pub fn bootstrap_invocation(client: NpmClient, kind: MonorepoKind) -> Invocation {
    match kind {
        MonorepoKind::Lerna => Invocation::new("npx", &["lerna", "bootstrap"]),
        MonorepoKind::Rush => Invocation::new("rush", &["update"]),
        MonorepoKind::Pnpm | MonorepoKind::Workspaces => install_all_invocation(client),
    }
}

/// Spawns real processes and talks to the npm registry over HTTP.
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    registry: NpmRegistry,
}

impl ProcessToolchain {
    pub fn new(registry: NpmRegistry) -> Self {
        Self { registry }
    }

    fn execute(&self, invocation: &Invocation, cwd: &Path) -> Result<(), UpgradeError> {
        let rendered = invocation.display();
        tracing::info!(cwd = %cwd.display(), "running {rendered}");
        let status = Command::new(platform_program(&invocation.program))
            .args(&invocation.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| UpgradeError::DependencyInstall {
                command: rendered.clone(),
                message: e.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(UpgradeError::DependencyInstall {
                command: rendered,
                message: match status.code() {
                    Some(code) => format!("exited with code {code}"),
                    None => "terminated by signal".to_string(),
                },
            })
        }
    }
}

impl Toolchain for ProcessToolchain {
    fn resolve_registry_version(
        &self,
        name: &ShellName,
        selector: &str,
    ) -> Result<String, UpgradeError> {
        self.registry.resolve(name, selector)
    }

    fn install_package(
        &self,
        client: NpmClient,
        package: &PackageRef,
        root: &Path,
        flags: InstallFlags,
    ) -> Result<(), UpgradeError> {
        self.execute(&install_package_invocation(client, package, flags), root)
    }

    fn install_all(&self, client: NpmClient, root: &Path) -> Result<(), UpgradeError> {
        self.execute(&install_all_invocation(client), root)
    }

    fn bootstrap_monorepo(
        &self,
        client: NpmClient,
        kind: MonorepoKind,
        monorepo_root: &Path,
    ) -> Result<(), UpgradeError> {
        self.execute(&bootstrap_invocation(client, kind), monorepo_root)
    }

    fn run_script(&self, command: &str, cwd: &Path) -> Result<(), UpgradeError> {
        let (shell, flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        let hook_err = |code| UpgradeError::HookExecution {
            command: command.to_string(),
            code,
        };
        let status = Command::new(shell)
            .arg(flag)
            .arg(command)
            .current_dir(cwd)
            .env("PATH", path_with_local_bin(cwd))
            .status()
            .map_err(|e| {
                tracing::warn!("could not spawn {shell}: {e}");
                hook_err(None)
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(hook_err(status.code()))
        }
    }
}

/// `PATH` with `<cwd>/node_modules/.bin` in front.
fn path_with_local_bin(cwd: &Path) -> OsString {
    let local_bin = cwd.join("node_modules").join(".bin");
    let existing = std::env::var_os("PATH").unwrap_or_default();
    let dirs: Vec<PathBuf> = std::iter::once(local_bin)
        .chain(std::env::split_paths(&existing))
        .collect();
    std::env::join_paths(dirs).unwrap_or(existing)
}

/// Node package managers ship as `.cmd` shims on Windows.
fn platform_program(program: &str) -> String {
    if cfg!(windows) && program != "bun" {
        format!("{program}.cmd")
    } else {
        program.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn shell_ref(selector: &str) -> PackageRef {
        PackageRef::new(ShellName::from("my-shell"), selector)
    }

    #[rstest]
    #[case(NpmClient::Npm, "npm install my-shell@2.0.0 --no-save")]
    #[case(NpmClient::Yarn, "yarn add my-shell@2.0.0 --no-save")]
    #[case(NpmClient::Pnpm, "pnpm add my-shell@2.0.0 --no-save")]
    #[case(NpmClient::Bun, "bun add my-shell@2.0.0 --no-save")]
    fn targeted_install_command(#[case] client: NpmClient, #[case] expected: &str) {
        let inv = install_package_invocation(client, &shell_ref("2.0.0"), InstallFlags::NO_SAVE);
        assert_eq!(inv.display(), expected);
    }

    #[test]
    fn targeted_install_without_flags() {
        let inv = install_package_invocation(
            NpmClient::Npm,
            &shell_ref("latest"),
            InstallFlags::default(),
        );
        assert_eq!(inv.display(), "npm install my-shell@latest");
    }

    #[rstest]
    #[case(MonorepoKind::Lerna, NpmClient::Npm, "npx lerna bootstrap")]
    #[case(MonorepoKind::Rush, NpmClient::Npm, "rush update")]
    #[case(MonorepoKind::Workspaces, NpmClient::Yarn, "yarn install")]
    #[case(MonorepoKind::Pnpm, NpmClient::Pnpm, "pnpm install")]
    fn bootstrap_commands(
        #[case] kind: MonorepoKind,
        #[case] client: NpmClient,
        #[case] expected: &str,
    ) {
        assert_eq!(bootstrap_invocation(client, kind).display(), expected);
    }

    #[test]
    fn local_bin_goes_first_on_path() {
        let path = path_with_local_bin(Path::new("/proj"));
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, Path::new("/proj/node_modules/.bin"));
    }

    #[test]
    #[cfg(unix)]
    fn script_exit_code_is_reported() {
        let tmp = TempDir::new().unwrap();
        let toolchain = ProcessToolchain::new(NpmRegistry::new("http://127.0.0.1:9"));

        toolchain.run_script("true", tmp.path()).unwrap();
        let err = toolchain.run_script("exit 3", tmp.path()).unwrap_err();
        assert!(
            matches!(err, UpgradeError::HookExecution { code: Some(3), .. }),
            "got: {err}"
        );
    }

    #[test]
    #[cfg(unix)]
    fn script_sees_local_binaries_and_runs_in_cwd() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("node_modules").join(".bin");
        std::fs::create_dir_all(&bin).unwrap();
        let tool = bin.join("shell-tool");
        std::fs::write(&tool, "#!/bin/sh\necho ran > marker.txt\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let toolchain = ProcessToolchain::new(NpmRegistry::new("http://127.0.0.1:9"));
        toolchain.run_script("shell-tool", tmp.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("marker.txt")).unwrap(),
            "ran\n"
        );
    }
}
