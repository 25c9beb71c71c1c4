//! npm registry client used to turn a selector into a concrete version.
//!
//! Selector resolution order: dist-tag, exact version, semver range (highest
//! matching, pre-releases only when the range asks for them).

use std::collections::BTreeMap;
use std::time::Duration;

use semver::{Version, VersionReq};
use serde::Deserialize;

use pilet_core::ShellName;

use crate::error::UpgradeError;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";
pub const REGISTRY_ENV: &str = "NPM_CONFIG_REGISTRY";

const ABBREVIATED_METADATA: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

/// The subset of a packument needed for version selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Packument {
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, serde_json::Value>,
}

/// Blocking HTTP client for one registry.
#[derive(Clone)]
pub struct NpmRegistry {
    base_url: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for NpmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpmRegistry")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl NpmRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    /// `explicit`, then `NPM_CONFIG_REGISTRY`, then the public registry.
    pub fn from_env(explicit: Option<&str>) -> Self {
        let url = explicit
            .map(str::to_string)
            .or_else(|| std::env::var(REGISTRY_ENV).ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        Self::new(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetch(&self, name: &ShellName) -> Result<Packument, UpgradeError> {
        let url = packument_url(&self.base_url, name.as_str());
        tracing::debug!(%url, "fetching packument");
        let response = self
            .agent
            .get(&url)
            .set("Accept", ABBREVIATED_METADATA)
            .call()
            .map_err(|e| resolution_err(name, "*", e.to_string()))?;
        response
            .into_json::<Packument>()
            .map_err(|e| resolution_err(name, "*", format!("invalid packument: {e}")))
    }

    pub fn resolve(&self, name: &ShellName, selector: &str) -> Result<String, UpgradeError> {
        let packument = self.fetch(name)?;
        select_version(&packument, selector).ok_or_else(|| {
            resolution_err(name, selector, "no published version matches".to_string())
        })
    }
}

/// `<base>/<name>` with the scope slash percent-encoded.
pub fn packument_url(base_url: &str, name: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        name.replace('/', "%2f")
    )
}

/// Pick the version `selector` designates within `packument`.
pub fn select_version(packument: &Packument, selector: &str) -> Option<String> {
    let selector = selector.trim();
    if let Some(tagged) = packument.dist_tags.get(selector) {
        return Some(tagged.clone());
    }
    if packument.versions.contains_key(selector) {
        return Some(selector.to_string());
    }

    let alternatives = parse_range(selector)?;
    packument
        .versions
        .keys()
        .filter_map(|v| Version::parse(v).ok())
        .filter(|v| alternatives.iter().any(|req| req.matches(v)))
        .max()
        .map(|v| v.to_string())
}

/// An npm range is a `||`-separated union of comparator sets.
fn parse_range(selector: &str) -> Option<Vec<VersionReq>> {
    selector
        .split("||")
        .map(|alternative| parse_comparators(alternative.trim()))
        .collect()
}

/// One comparator set. npm separates comparators with spaces where semver
/// wants commas, and `a - b` means `>=a <=b`.
fn parse_comparators(range: &str) -> Option<VersionReq> {
    if range.is_empty() || range == "*" || range == "x" {
        return Some(VersionReq::STAR);
    }
    if let Some((low, high)) = range.split_once(" - ") {
        return VersionReq::parse(&format!(">={}, <={}", low.trim(), high.trim())).ok();
    }
    VersionReq::parse(range)
        .or_else(|_| VersionReq::parse(&range.split_whitespace().collect::<Vec<_>>().join(", ")))
        .ok()
}

fn resolution_err(name: &ShellName, selector: &str, message: String) -> UpgradeError {
    UpgradeError::RegistryResolution {
        reference: format!("{name}@{selector}"),
        message,
    }
}
