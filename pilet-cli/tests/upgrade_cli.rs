use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn pilet_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pilet"));
    cmd.current_dir(cwd)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .env("NPM_CONFIG_REGISTRY", "http://127.0.0.1:9");
    cmd
}

#[test]
fn help_lists_the_upgrade_flags() {
    let tmp = TempDir::new().unwrap();
    pilet_cmd(tmp.path())
        .args(["upgrade", "--help"])
        .assert()
        .success()
        .stdout(contains("--force-overwrite"))
        .stdout(contains("--no-install"))
        .stdout(contains("--npm-client"));
}

#[test]
fn missing_target_fails_with_phase() {
    let tmp = TempDir::new().unwrap();
    pilet_cmd(tmp.path())
        .args(["upgrade", "nowhere"])
        .assert()
        .failure()
        .stderr(contains("validate target"))
        .stderr(contains("does not exist"));
}

#[test]
fn project_without_piral_section_is_rejected_untouched() {
    let tmp = TempDir::new().unwrap();
    let manifest = r#"{"name":"plain-app","dependencies":{}}"#;
    fs::write(tmp.path().join("package.json"), manifest).unwrap();

    pilet_cmd(tmp.path())
        .args(["upgrade", "--version", "2.0.0"])
        .assert()
        .failure()
        .stderr(contains("missing \"piral\" section"));

    assert_eq!(
        fs::read_to_string(tmp.path().join("package.json")).unwrap(),
        manifest
    );
    assert!(!tmp.path().join("node_modules").exists());
}

#[test]
fn unknown_overwrite_policy_is_a_usage_error() {
    let tmp = TempDir::new().unwrap();
    pilet_cmd(tmp.path())
        .args(["upgrade", "--force-overwrite", "sometimes"])
        .assert()
        .failure()
        .stderr(contains("unknown overwrite policy"));
}

#[test]
fn log_level_out_of_range_is_rejected() {
    let tmp = TempDir::new().unwrap();
    pilet_cmd(tmp.path())
        .args(["upgrade", "--log-level", "9"])
        .assert()
        .failure();
}

/// A workspace sibling shell needs neither the registry nor an installer.
#[cfg(unix)]
fn monorepo_with_local_shell(tmp: &Path) -> std::path::PathBuf {
    fs::write(
        tmp.join("package.json"),
        r#"{"private":true,"workspaces":["packages/*"]}"#,
    )
    .unwrap();
    let shell = tmp.join("packages").join("app-shell");
    fs::create_dir_all(&shell).unwrap();
    fs::write(
        shell.join("package.json"),
        r#"{"name":"app-shell","version":"2.0.0","pilets":{"files":["tsconfig.json"]}}"#,
    )
    .unwrap();
    fs::write(shell.join("tsconfig.json"), "{\"strict\":true}\n").unwrap();

    let pilet = tmp.join("packages").join("my-pilet");
    fs::create_dir_all(pilet.join("node_modules")).unwrap();
    fs::write(
        pilet.join("package.json"),
        "{\n  \"name\": \"my-pilet\",\n  \"devDependencies\": {\n    \"app-shell\": \"1.0.0\"\n  },\n  \"piral\": {\n    \"name\": \"app-shell\"\n  }\n}\n",
    )
    .unwrap();
    std::os::unix::fs::symlink(&shell, pilet.join("node_modules").join("app-shell")).unwrap();
    pilet
}

#[test]
#[cfg(unix)]
fn upgrades_against_a_workspace_sibling() {
    let tmp = TempDir::new().unwrap();
    let pilet = monorepo_with_local_shell(tmp.path());

    pilet_cmd(tmp.path())
        .args(["upgrade", "packages/my-pilet", "--no-install"])
        .assert()
        .success()
        .stdout(contains("tsconfig.json"))
        .stdout(contains("created"));

    let manifest = fs::read_to_string(pilet.join("package.json")).unwrap();
    assert!(manifest.contains("\"app-shell\": \"2.0.0\""), "{manifest}");
    assert_eq!(
        fs::read_to_string(pilet.join("tsconfig.json")).unwrap(),
        "{\"strict\":true}\n"
    );
}

#[test]
#[cfg(unix)]
fn json_summary_is_machine_readable() {
    let tmp = TempDir::new().unwrap();
    let pilet = monorepo_with_local_shell(tmp.path());

    let output = pilet_cmd(&pilet)
        .args(["upgrade", "--no-install", "--json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["version"], "2.0.0");
    assert_eq!(summary["previous"], "1.0.0");
    assert_eq!(summary["monorepo_local"], true);
    assert_eq!(summary["installed"], false);
    assert_eq!(summary["files"][0]["action"], "created");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Pilet upgraded to app-shell@2.0.0"), "stderr: {stderr}");
}

#[test]
#[cfg(unix)]
fn relative_base_dir_still_finds_the_monorepo_root() {
    let tmp = TempDir::new().unwrap();
    let pilet = monorepo_with_local_shell(tmp.path());

    let output = pilet_cmd(&pilet)
        .args(["upgrade", "--base-dir", ".", "--no-install", "--json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["topology"], "monorepo (workspaces)");
}
