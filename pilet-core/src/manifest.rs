//! `package.json` access for pilets and shell packages.
//!
//! The pilet manifest is held as an order-preserving JSON object so a patch
//! touches exactly one value and leaves every other field as it was.
//!
//! Writes use the atomic `.tmp` + rename pattern.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{io_err, ManifestError};
use crate::types::{ShellName, ShellPackageInfo, ShellReference};

/// File name of every npm manifest.
pub const MANIFEST_FILE: &str = "package.json";

const DEFAULT_INDENT: &str = "  ";

/// A pilet's `package.json`, loaded for in-place patching.
#[derive(Debug, Clone)]
pub struct PiletManifest {
    path: PathBuf,
    fields: Map<String, Value>,
    indent: String,
}

impl PiletManifest {
    /// Load `<dir>/package.json`.
    pub fn read(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| ManifestError::Parse {
            path: path.clone(),
            source: e,
        })?;
        let Value::Object(fields) = value else {
            return Err(ManifestError::NotAnObject { path });
        };
        Ok(Self {
            indent: detect_indent(&contents),
            path,
            fields,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Validate and extract the app-shell reference.
    ///
    /// - no `piral` object → [`ManifestError::NotAPiletProject`]
    /// - `piral.name` not a non-empty string → [`ManifestError::InvalidShellPackage`]
    /// - `devDependencies[name]` not a non-empty string →
    ///   [`ManifestError::InvalidShellReference`]
    pub fn shell_reference(&self) -> Result<ShellReference, ManifestError> {
        let Some(Value::Object(piral)) = self.fields.get("piral") else {
            return Err(ManifestError::NotAPiletProject {
                path: self.path.clone(),
            });
        };

        let name = match piral.get("name") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => {
                return Err(ManifestError::InvalidShellPackage {
                    path: self.path.clone(),
                })
            }
        };

        let version = self
            .fields
            .get("devDependencies")
            .and_then(|deps| deps.get(&name))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ManifestError::InvalidShellReference { name: name.clone() })?;

        Ok(ShellReference {
            name: ShellName::from(name),
            version: version.to_owned(),
        })
    }

    /// Set `devDependencies[name] = version`, creating the map if needed.
    ///
    /// Existing keys keep their position.
    pub fn set_shell_version(&mut self, name: &ShellName, version: &str) {
        let deps = self
            .fields
            .entry("devDependencies")
            .or_insert_with(|| Value::Object(Map::new()));
        if !deps.is_object() {
            *deps = Value::Object(Map::new());
        }
        if let Value::Object(map) = deps {
            map.insert(name.0.clone(), Value::String(version.to_owned()));
        }
    }

    /// Serialize with the file's original indentation and a trailing newline.
    pub fn to_json_string(&self) -> Result<String, ManifestError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.fields.serialize(&mut ser)?;
        let mut out = String::from_utf8_lossy(&buf).into_owned();
        out.push('\n');
        Ok(out)
    }

    /// Atomically write the manifest back to where it was read from.
    pub fn save(&self) -> Result<(), ManifestError> {
        let json = self.to_json_string()?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        tracing::debug!("patched manifest: {}", self.path.display());
        Ok(())
    }
}

/// Read the shell package metadata from `<package_dir>/package.json`.
pub fn read_shell_package(package_dir: &Path) -> Result<ShellPackageInfo, ManifestError> {
    let path = package_dir.join(MANIFEST_FILE);
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_json::from_str(&contents).map_err(|e| ManifestError::Parse { path, source: e })
}

/// Leading whitespace of the first indented line, or two spaces.
fn detect_indent(contents: &str) -> String {
    contents
        .lines()
        .skip(1)
        .find_map(|line| {
            let indent: String = line
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect();
            (!indent.is_empty()).then_some(indent)
        })
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
