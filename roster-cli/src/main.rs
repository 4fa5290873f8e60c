//! Roster — git-mirrored audit trail for access-control groups.
//!
//! # Usage
//!
//! ```text
//! roster run --config <roster.yaml> --input <run.yaml>
//! roster plan --config <roster.yaml> --input <run.yaml> [--json]
//! roster check-config --config <roster.yaml>
//! ```
//!
//! Add `--debug` to any command for per-entity classification logs.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check_config::CheckConfigArgs, plan::PlanArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Record access-control group changes in a git mirror",
    long_about = None,
)]
struct Cli {
    /// Log every classification decision and git command.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone or pull the mirror, reconcile, and commit the results.
    Run(RunArgs),

    /// Show what a run would commit, without touching git.
    Plan(PlanArgs),

    /// Validate a configuration file.
    CheckConfig(CheckConfigArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::CheckConfig(args) => args.run(),
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_target(false)
        .try_init();
}
