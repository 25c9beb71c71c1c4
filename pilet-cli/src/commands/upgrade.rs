//! `pilet upgrade` — move a pilet to a newer app shell.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pilet_core::{NpmClient, OverwritePolicy, Reporter, TracingReporter};
use pilet_sync::{FileAction, FileOutcome, SkipReason, TerminalPrompt};
use pilet_upgrade::{
    upgrade_pilet, Capabilities, NpmRegistry, ProcessToolchain, UpgradeOptions, UpgradeReport,
};

/// Arguments for `pilet upgrade`.
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Pilet directory, relative to the base directory.
    #[arg(default_value = ".")]
    pub target: PathBuf,

    /// Directory the target is resolved against (defaults to the current directory).
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Version, dist-tag, or range of the app shell to upgrade to.
    #[arg(long)]
    pub version: Option<String>,

    /// What to do with template files you changed locally: no, yes, prompt.
    #[arg(long, default_value_t = OverwritePolicy::No)]
    pub force_overwrite: OverwritePolicy,

    /// Only patch the manifest and files; skip reinstalling dependencies.
    #[arg(long)]
    pub no_install: bool,

    /// Package manager to use instead of the detected one.
    #[arg(long)]
    pub npm_client: Option<NpmClient>,

    /// npm registry URL (defaults to NPM_CONFIG_REGISTRY, then registry.npmjs.org).
    #[arg(long)]
    pub registry: Option<String>,

    /// Emit a machine-readable summary.
    #[arg(long)]
    pub json: bool,
}

impl UpgradeArgs {
    pub fn run(self, log_level: u8) -> Result<()> {
        let base_dir = match self.base_dir.clone() {
            Some(dir) => dir,
            None => std::env::current_dir().context("could not determine current directory")?,
        };

        let options = UpgradeOptions {
            target: self.target.clone(),
            version: self.version.clone(),
            policy: self.force_overwrite,
            install: !self.no_install,
            npm_client: self.npm_client,
        };
        let toolchain = ProcessToolchain::new(NpmRegistry::from_env(self.registry.as_deref()));
        // stdout carries the JSON payload, so progress goes to the tracing
        // subscriber on stderr instead.
        let console = ConsoleReporter { level: log_level };
        let reporter: &dyn Reporter = if self.json { &TracingReporter } else { &console };
        let caps = Capabilities {
            toolchain: &toolchain,
            prompt: &TerminalPrompt,
            reporter,
        };

        let report = match upgrade_pilet(&base_dir, &options, caps) {
            Ok(report) => report,
            Err(err) => {
                let phase = err.phase();
                return Err(anyhow::Error::new(err).context(format!("upgrade failed ({phase})")));
            }
        };

        if self.json {
            print_json(&report)
        } else {
            print_summary(&base_dir, &report);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Console reporter
// ---------------------------------------------------------------------------

/// Prints progress to stderr according to `--log-level`.
struct ConsoleReporter {
    level: u8,
}

impl Reporter for ConsoleReporter {
    fn progress(&self, message: &str) {
        if self.level >= 3 {
            eprintln!("{} {message}", "›".cyan());
        }
    }

    fn debug(&self, message: &str) {
        if self.level >= 4 {
            eprintln!("  {}", message.bright_black());
        }
    }

    fn warn(&self, message: &str) {
        if self.level >= 2 {
            eprintln!("{} {message}", "warning:".yellow().bold());
        }
    }

    fn done(&self, message: &str) {
        if self.level >= 1 {
            eprintln!("{} {message}", "✓".green().bold());
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "result")]
    result: String,
}

#[derive(Serialize)]
struct UpgradeJson<'a> {
    shell: &'a str,
    previous: &'a str,
    version: &'a str,
    package: String,
    monorepo_local: bool,
    mode: String,
    topology: String,
    npm_client: String,
    hooks: Vec<String>,
    installed: bool,
    files: &'a [FileOutcome],
}

fn print_json(report: &UpgradeReport) -> Result<()> {
    let payload = UpgradeJson {
        shell: report.shell.as_str(),
        previous: &report.previous,
        version: &report.resolved.version,
        package: report.resolved.package_ref.to_string(),
        monorepo_local: report.resolved.is_monorepo_local(),
        mode: report.mode.to_string(),
        topology: report.topology.to_string(),
        npm_client: report.npm_client.to_string(),
        hooks: report.hooks_run.iter().map(ToString::to_string).collect(),
        installed: report.installed,
        files: &report.files.outcomes,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize upgrade summary")?
    );
    Ok(())
}

fn print_summary(base_dir: &Path, report: &UpgradeReport) {
    let base_dir = std::fs::canonicalize(base_dir).unwrap_or_else(|_| base_dir.to_path_buf());
    let root = report.root.strip_prefix(&base_dir).unwrap_or(&report.root);
    println!(
        "{} {} → {} in {} ({}, {})",
        report.shell.as_str().bold(),
        report.previous,
        report.resolved.version.green(),
        root.display(),
        report.mode,
        report.topology,
    );

    if report.files.outcomes.is_empty() {
        println!("No template files to synchronize.");
        return;
    }

    let rows: Vec<FileRow> = report
        .files
        .outcomes
        .iter()
        .map(|outcome| FileRow {
            file: outcome.path.display().to_string(),
            result: action_label(outcome.action),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    println!(
        "{} written, {} kept",
        report.files.written(),
        report.files.skipped()
    );
    let customized = report
        .files
        .count(|a| matches!(a, FileAction::Skipped(SkipReason::Customized)));
    if customized > 0 {
        println!(
            "{}",
            "Locally modified files were kept. Re-run with --force-overwrite prompt to review them."
                .yellow()
        );
    }
}

fn action_label(action: FileAction) -> String {
    match action {
        FileAction::Created => "created".green().to_string(),
        FileAction::Replaced => "updated".green().to_string(),
        FileAction::Unchanged => "unchanged".bright_black().to_string(),
        FileAction::Skipped(SkipReason::Once) => "kept (place-once)".bright_black().to_string(),
        FileAction::Skipped(SkipReason::Customized) => "kept (modified)".yellow().to_string(),
        FileAction::Skipped(SkipReason::Declined) => "kept (declined)".yellow().to_string(),
    }
}
