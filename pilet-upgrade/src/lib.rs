//! # pilet-upgrade
//!
//! Upgrades a pilet to a newer version of its app shell.
//!
//! The entry point is [`upgrade_pilet`]. Everything that leaves the process
//! (registry lookups, package managers, hook scripts) goes through the
//! [`Toolchain`] trait; [`ProcessToolchain`] is the real implementation.

pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod toolchain;

pub use error::UpgradeError;
pub use hooks::HookStage;
pub use pipeline::{upgrade_pilet, Capabilities, UpgradeOptions, UpgradeReport};
pub use registry::NpmRegistry;
pub use resolver::ResolvedShell;
pub use toolchain::{InstallFlags, ProcessToolchain, Toolchain};
