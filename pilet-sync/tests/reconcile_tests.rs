//! Reconciliation behaviour across both sync modes.
//!
//! Every test builds a throwaway project with an "old" shell installed,
//! snapshots it, swaps in a "new" shell, then reconciles.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use pilet_core::{
    read_shell_package, MemoryReporter, OverwritePolicy, ShellName, SyncMode,
};
use pilet_sync::{
    capture, reconcile, FileAction, FileSnapshot, ReconcileReport, ReconcileRequest, SkipReason,
    SyncError,
};
use predicates::prelude::predicate;
use rstest::rstest;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SHELL: &str = "my-shell";

fn shell_dir(root: &Path) -> PathBuf {
    root.join("node_modules").join(SHELL)
}

/// Install a scaffolding shell declaring `files`, with the given contents.
fn install_scaffold_shell(root: &Path, version: &str, descriptors: &str, files: &[(&str, &str)]) {
    let dir = shell_dir(root);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("package.json"),
        format!(r#"{{"name":"{SHELL}","version":"{version}","pilets":{{"files":{descriptors}}}}}"#),
    )
    .unwrap();
    for (path, contents) in files {
        let path = dir.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

fn write_tar(path: &Path, files: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut builder = tar::Builder::new(file);
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, contents.as_bytes()).unwrap();
    }
    builder.finish().unwrap();
}

/// Install an emulator shell carrying `files.tar` and `files_once.tar`.
fn install_emulator_shell(root: &Path, version: &str, files: &[(&str, &str)], once: &[(&str, &str)]) {
    let dir = shell_dir(root);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("package.json"),
        format!(r#"{{"name":"{SHELL}","version":"{version}","piralCLI":{{"generated":true}}}}"#),
    )
    .unwrap();
    write_tar(&dir.join("files.tar"), files);
    write_tar(&dir.join("files_once.tar"), once);
}

fn run(root: &Path, policy: OverwritePolicy, snapshot: &FileSnapshot) -> ReconcileReport {
    run_with_prompt(root, policy, snapshot, &|_: &Path, _: &str| false)
}

fn run_with_prompt(
    root: &Path,
    policy: OverwritePolicy,
    snapshot: &FileSnapshot,
    prompt: &dyn pilet_sync::ConflictPrompt,
) -> ReconcileReport {
    let package_dir = shell_dir(root);
    let info = read_shell_package(&package_dir).unwrap();
    let shell = ShellName::from(SHELL);
    reconcile(
        ReconcileRequest {
            mode: info.sync_mode(),
            root,
            shell: &shell,
            package_dir: &package_dir,
            files: &info.pilets.files,
            policy,
            snapshot,
        },
        prompt,
        &MemoryReporter::new(),
    )
    .expect("reconcile")
}

fn action_for(report: &ReconcileReport, path: &str) -> FileAction {
    report
        .outcomes
        .iter()
        .find(|o| o.path == Path::new(path))
        .unwrap_or_else(|| panic!("no outcome for {path}: {report:?}"))
        .action
}

// ---------------------------------------------------------------------------
// 1. Scaffolding mode
// ---------------------------------------------------------------------------

const DESCRIPTORS: &str =
    r#"[".eslintrc", {"from": "tpl/index.tsx", "to": "src/index.tsx", "once": true}]"#;

#[rstest]
#[case(OverwritePolicy::No, "user rules")]
#[case(OverwritePolicy::Yes, "rules v2")]
fn customized_file_follows_policy(#[case] policy: OverwritePolicy, #[case] expected: &str) {
    let root = assert_fs::TempDir::new().unwrap();
    install_scaffold_shell(root.path(), "1.0.0", DESCRIPTORS, &[(".eslintrc", "rules v1"), ("tpl/index.tsx", "v1")]);
    root.child(".eslintrc").write_str("user rules").unwrap();

    let snapshot = capture(root.path(), &ShellName::from(SHELL)).unwrap();
    install_scaffold_shell(root.path(), "2.0.0", DESCRIPTORS, &[(".eslintrc", "rules v2"), ("tpl/index.tsx", "v2")]);

    run(root.path(), policy, &snapshot);
    root.child(".eslintrc").assert(expected);
}

#[rstest]
#[case(OverwritePolicy::No)]
#[case(OverwritePolicy::Yes)]
fn line_ending_only_difference_is_rewritten(#[case] policy: OverwritePolicy) {
    let root = assert_fs::TempDir::new().unwrap();
    install_scaffold_shell(root.path(), "1.0.0", DESCRIPTORS, &[(".eslintrc", "x\ny\n"), ("tpl/index.tsx", "v1")]);
    root.child(".eslintrc").write_str("x\r\ny\r\n").unwrap();

    let snapshot = capture(root.path(), &ShellName::from(SHELL)).unwrap();
    install_scaffold_shell(root.path(), "2.0.0", DESCRIPTORS, &[(".eslintrc", "x\ny\n"), ("tpl/index.tsx", "v2")]);

    let report = run(root.path(), policy, &snapshot);
    assert_eq!(action_for(&report, ".eslintrc"), FileAction::Replaced);
    root.child(".eslintrc").assert("x\ny\n");
}

#[test]
fn unmodified_shell_file_is_upgraded_under_no_overwrite() {
    let root = assert_fs::TempDir::new().unwrap();
    install_scaffold_shell(root.path(), "1.0.0", DESCRIPTORS, &[(".eslintrc", "rules v1"), ("tpl/index.tsx", "v1")]);
    root.child(".eslintrc").write_str("rules v1").unwrap();

    let snapshot = capture(root.path(), &ShellName::from(SHELL)).unwrap();
    install_scaffold_shell(root.path(), "2.0.0", DESCRIPTORS, &[(".eslintrc", "rules v2"), ("tpl/index.tsx", "v2")]);

    let report = run(root.path(), OverwritePolicy::No, &snapshot);
    assert_eq!(action_for(&report, ".eslintrc"), FileAction::Replaced);
    root.child(".eslintrc").assert("rules v2");
}

#[test]
fn existing_once_file_is_never_modified_and_rerun_is_noop() {
    let root = assert_fs::TempDir::new().unwrap();
    install_scaffold_shell(root.path(), "2.0.0", DESCRIPTORS, &[(".eslintrc", "rules v2"), ("tpl/index.tsx", "v2")]);
    root.child("src/index.tsx").write_str("my app").unwrap();

    let first = run(root.path(), OverwritePolicy::Yes, &FileSnapshot::empty());
    root.child("src/index.tsx").assert("my app");
    assert!(first.outcomes.iter().all(|o| o.path != Path::new("src/index.tsx")));

    let second = run(root.path(), OverwritePolicy::Yes, &FileSnapshot::empty());
    root.child("src/index.tsx").assert("my app");
    assert_eq!(second.written(), 0, "second run must be a no-op: {second:?}");
}

#[test]
fn once_file_is_placed_when_absent() {
    let root = assert_fs::TempDir::new().unwrap();
    install_scaffold_shell(root.path(), "2.0.0", DESCRIPTORS, &[(".eslintrc", "rules v2"), ("tpl/index.tsx", "v2")]);

    let report = run(root.path(), OverwritePolicy::No, &FileSnapshot::empty());
    assert_eq!(action_for(&report, "src/index.tsx"), FileAction::Created);
    root.child("src/index.tsx").assert("v2");
}

#[test]
fn files_outside_the_new_set_are_never_deleted() {
    let root = assert_fs::TempDir::new().unwrap();
    install_scaffold_shell(root.path(), "2.0.0", r#"[".eslintrc"]"#, &[(".eslintrc", "rules v2")]);
    root.child("src/legacy.tsx").write_str("old code").unwrap();
    root.child("README.md").write_str("docs").unwrap();

    run(root.path(), OverwritePolicy::Yes, &FileSnapshot::empty());
    root.child("src/legacy.tsx").assert("old code");
    root.child("README.md").assert("docs");
    root.child(".eslintrc").assert("rules v2");
}

#[test]
fn prompt_decides_customized_files_and_sees_diff() {
    let root = assert_fs::TempDir::new().unwrap();
    install_scaffold_shell(
        root.path(),
        "2.0.0",
        r#"["a.txt", "b.txt"]"#,
        &[("a.txt", "new a\n"), ("b.txt", "new b\n")],
    );
    root.child("a.txt").write_str("mine a\n").unwrap();
    root.child("b.txt").write_str("mine b\n").unwrap();

    let seen = RefCell::new(Vec::new());
    let prompt = |path: &Path, diff: &str| {
        seen.borrow_mut().push(diff.to_string());
        path == Path::new("a.txt")
    };
    let report = run_with_prompt(root.path(), OverwritePolicy::Prompt, &FileSnapshot::empty(), &prompt);

    root.child("a.txt").assert("new a\n");
    root.child("b.txt").assert("mine b\n");
    assert_eq!(action_for(&report, "b.txt"), FileAction::Skipped(SkipReason::Declined));
    let seen = seen.into_inner();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].contains("-mine a"));
    assert!(seen[0].contains("+new a"));
}

#[test]
fn escaping_descriptor_fails_with_path() {
    let root = assert_fs::TempDir::new().unwrap();
    install_scaffold_shell(
        root.path(),
        "2.0.0",
        r#"[{"from": "a.txt", "to": "../../evil.txt"}]"#,
        &[("a.txt", "x")],
    );
    let package_dir = shell_dir(root.path());
    let info = read_shell_package(&package_dir).unwrap();
    let shell = ShellName::from(SHELL);
    let err = reconcile(
        ReconcileRequest {
            mode: SyncMode::Scaffolding,
            root: root.path(),
            shell: &shell,
            package_dir: &package_dir,
            files: &info.pilets.files,
            policy: OverwritePolicy::Yes,
            snapshot: &FileSnapshot::empty(),
        },
        &|_: &Path, _: &str| true,
        &MemoryReporter::new(),
    )
    .unwrap_err();
    assert!(matches!(err, SyncError::UnsafePath { .. }), "got: {err}");
    assert!(err.path().is_some());
}

// ---------------------------------------------------------------------------
// 2. Emulator mode
// ---------------------------------------------------------------------------

#[test]
fn emulator_mode_uses_bundled_tarballs() {
    let root = assert_fs::TempDir::new().unwrap();
    install_emulator_shell(
        root.path(),
        "1.0.0",
        &[("tsconfig.json", "{\"v\":1}"), (".eslintrc", "rules v1")],
        &[("src/index.tsx", "v1")],
    );
    root.child("tsconfig.json").write_str("{\"v\":1}").unwrap();
    root.child(".eslintrc").write_str("user rules").unwrap();
    root.child("src/index.tsx").write_str("my app").unwrap();

    let snapshot = capture(root.path(), &ShellName::from(SHELL)).unwrap();
    assert_eq!(snapshot.len(), 3);

    install_emulator_shell(
        root.path(),
        "2.0.0",
        &[("tsconfig.json", "{\"v\":2}"), (".eslintrc", "rules v2"), ("new.d.ts", "decl")],
        &[("src/index.tsx", "v2")],
    );
    let report = run(root.path(), OverwritePolicy::No, &snapshot);

    root.child("tsconfig.json").assert("{\"v\":2}");
    root.child(".eslintrc").assert("user rules");
    root.child("src/index.tsx").assert("my app");
    root.child("new.d.ts").assert("decl");
    assert_eq!(action_for(&report, "new.d.ts"), FileAction::Created);
    assert_eq!(
        action_for(&report, "src/index.tsx"),
        FileAction::Skipped(SkipReason::Once)
    );
    root.child("node_modules/.cache/piral/my-shell/files/tsconfig.json")
        .assert(predicate::path::exists());
}
