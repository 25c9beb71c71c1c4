//! Candidate files for reconciliation.
//!
//! A [`SourceFile`] pairs a file on disk (inside the installed shell package
//! or the emulator extraction cache) with its destination inside the pilet.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use pilet_core::{Reporter, ScaffoldFile};

use crate::archive;
use crate::error::{io_err, SyncError};
use crate::paths::{safe_relative, EMULATOR_FILES_TAR, EMULATOR_ONCE_TAR};

/// One file the new shell version provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Destination relative to the project root.
    pub target: PathBuf,
    /// Readable file holding the new content.
    pub origin: PathBuf,
    /// Place only when the destination is absent.
    pub once: bool,
}

/// Descriptors still eligible for copying into `root`.
///
/// Plain paths and regular entries always pass; `once` entries only while
/// their destination does not exist yet.
pub fn eligible_files<'a>(files: &'a [ScaffoldFile], root: &Path) -> Vec<&'a ScaffoldFile> {
    files
        .iter()
        .filter(|file| !file.once() || !root.join(file.target()).exists())
        .collect()
}

/// Expand scaffold descriptors against an installed package tree.
///
/// Directory descriptors are copied recursively. Missing sources are
/// reported and skipped.
pub fn scaffold_sources(
    package_dir: &Path,
    files: &[&ScaffoldFile],
    reporter: &dyn Reporter,
) -> Result<Vec<SourceFile>, SyncError> {
    let mut sources = Vec::new();
    for file in files {
        let source_rel = safe_relative(Path::new(file.source()))?;
        let target_rel = safe_relative(Path::new(file.target()))?;
        let origin = package_dir.join(&source_rel);

        let meta = match std::fs::metadata(&origin) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                reporter.warn(&format!(
                    "scaffold file \"{}\" not found in the shell package; skipped",
                    file.source()
                ));
                continue;
            }
            Err(err) => return Err(io_err(&origin, err)),
        };

        if meta.is_dir() {
            for entry in WalkDir::new(&origin).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| origin.clone());
                    io_err(path, e.into())
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let nested = entry.path().strip_prefix(&origin).unwrap_or(entry.path());
                sources.push(SourceFile {
                    target: target_rel.join(nested),
                    origin: entry.path().to_path_buf(),
                    once: file.once(),
                });
            }
        } else {
            sources.push(SourceFile {
                target: target_rel,
                origin,
                once: file.once(),
            });
        }
    }
    Ok(sources)
}

/// Unpack an emulator's bundled tarballs into `cache_dir` and list them.
///
/// `files.tar` yields regular candidates, `files_once.tar` place-once ones.
/// Either archive may be absent.
pub fn emulator_sources(package_dir: &Path, cache_dir: &Path) -> Result<Vec<SourceFile>, SyncError> {
    if cache_dir.exists() {
        std::fs::remove_dir_all(cache_dir).map_err(|e| io_err(cache_dir, e))?;
    }

    let mut sources = Vec::new();
    for (tar_name, subdir, once) in [
        (EMULATOR_FILES_TAR, "files", false),
        (EMULATOR_ONCE_TAR, "files_once", true),
    ] {
        let tar_path = package_dir.join(tar_name);
        if !tar_path.is_file() {
            continue;
        }
        let dest = cache_dir.join(subdir);
        for relative in archive::extract(&tar_path, &dest)? {
            sources.push(SourceFile {
                origin: dest.join(&relative),
                target: relative,
                once,
            });
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::write_tar;
    use pilet_core::{MemoryReporter, ReportEvent, ScaffoldEntry};
    use std::fs;
    use tempfile::TempDir;

    fn entry(path: &str, to: Option<&str>, once: bool) -> ScaffoldFile {
        ScaffoldFile::Entry(ScaffoldEntry {
            path: path.to_string(),
            to: to.map(str::to_string),
            once,
        })
    }

    #[test]
    fn existing_once_descriptor_is_not_eligible() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("app.tsx"), "mine").unwrap();
        let files = vec![
            ScaffoldFile::from("tsconfig.json"),
            entry("src/app.tsx", Some("app.tsx"), true),
            entry("src/new.tsx", None, true),
        ];
        let eligible = eligible_files(&files, root.path());
        let targets: Vec<_> = eligible.iter().map(|f| f.target()).collect();
        assert_eq!(targets, vec!["tsconfig.json", "src/new.tsx"]);
    }

    #[test]
    fn directory_descriptor_expands_recursively() {
        let pkg = TempDir::new().unwrap();
        fs::create_dir_all(pkg.path().join("template/src/deep")).unwrap();
        fs::write(pkg.path().join("template/src/a.ts"), "a").unwrap();
        fs::write(pkg.path().join("template/src/deep/b.ts"), "b").unwrap();

        let files = vec![entry("template/src", Some("src"), false)];
        let refs: Vec<_> = files.iter().collect();
        let reporter = MemoryReporter::new();
        let sources = scaffold_sources(pkg.path(), &refs, &reporter).unwrap();

        let targets: Vec<_> = sources.iter().map(|s| s.target.clone()).collect();
        assert_eq!(
            targets,
            vec![PathBuf::from("src/a.ts"), PathBuf::from("src/deep/b.ts")]
        );
    }

    #[test]
    fn missing_source_is_warned_and_skipped() {
        let pkg = TempDir::new().unwrap();
        let files = vec![ScaffoldFile::from("does-not-exist.json")];
        let refs: Vec<_> = files.iter().collect();
        let reporter = MemoryReporter::new();
        let sources = scaffold_sources(pkg.path(), &refs, &reporter).unwrap();
        assert!(sources.is_empty());
        assert!(matches!(reporter.events().as_slice(), [ReportEvent::Warn(_)]));
    }

    #[test]
    fn escaping_descriptor_is_rejected() {
        let pkg = TempDir::new().unwrap();
        let files = vec![entry("ok.txt", Some("../escape.txt"), false)];
        let refs: Vec<_> = files.iter().collect();
        let err = scaffold_sources(pkg.path(), &refs, &MemoryReporter::new()).unwrap_err();
        assert!(matches!(err, SyncError::UnsafePath { .. }), "got: {err}");
    }

    #[test]
    fn emulator_sources_mark_once_archive() {
        let pkg = TempDir::new().unwrap();
        write_tar(&pkg.path().join(EMULATOR_FILES_TAR), &[("tsconfig.json", "{}")]);
        write_tar(&pkg.path().join(EMULATOR_ONCE_TAR), &[("src/index.tsx", "x")]);
        let cache = pkg.path().join("cache");

        let sources = emulator_sources(pkg.path(), &cache).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(!sources[0].once);
        assert_eq!(sources[0].target, PathBuf::from("tsconfig.json"));
        assert!(sources[1].once);
        assert!(sources[1].origin.starts_with(cache.join("files_once")));
    }
}
