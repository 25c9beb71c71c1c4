//! Shell-declared lifecycle hooks.

use std::fmt;
use std::path::Path;

use pilet_core::Reporter;

use crate::error::UpgradeError;
use crate::toolchain::Toolchain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreUpgrade,
    PostUpgrade,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookStage::PreUpgrade => write!(f, "preUpgrade"),
            HookStage::PostUpgrade => write!(f, "postUpgrade"),
        }
    }
}

/// Run `command` for `stage` in `cwd`. Returns whether anything ran.
pub fn run_hook(
    toolchain: &dyn Toolchain,
    reporter: &dyn Reporter,
    stage: HookStage,
    command: Option<&str>,
    cwd: &Path,
) -> Result<bool, UpgradeError> {
    let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(false);
    };
    reporter.progress(&format!("Running {stage} script ..."));
    reporter.debug(&format!("Run: {command}"));
    toolchain.run_script(command, cwd)?;
    Ok(true)
}
