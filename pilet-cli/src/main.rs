//! pilet — keep pilets in step with their app shell.
//!
//! # Usage
//!
//! ```text
//! pilet upgrade [TARGET] [--version <selector>] [--force-overwrite no|yes|prompt]
//!               [--base-dir <dir>] [--no-install] [--npm-client npm|yarn|pnpm|bun]
//!               [--registry <url>] [--json] [--log-level 0..5]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::upgrade::UpgradeArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pilet",
    version,
    about = "Upgrade pilets to newer versions of their app shell",
    long_about = None,
)]
struct Cli {
    /// Verbosity: 0 off, 1 error, 2 warn, 3 info, 4 debug, 5 trace.
    #[arg(long, global = true, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=5))]
    log_level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upgrade a pilet to a newer version of its app shell.
    Upgrade(UpgradeArgs),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn level_directive(level: u8) -> &'static str {
    match level {
        0 => "off",
        1 => "error",
        2 => "warn",
        3 => "info",
        4 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` wins over `--log-level`.
fn init_tracing(level: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);
    match cli.command {
        Commands::Upgrade(args) => args.run(cli.log_level),
    }
}
