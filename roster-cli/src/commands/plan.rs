//! `roster plan` — show the sync and valid changes a run would commit.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use roster_sync::{diff_reconciliation, Auditor, CommitKind};

/// Arguments for `roster plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the audit configuration YAML.
    #[arg(long, short)]
    pub config: PathBuf,

    /// Path to the run file (desired state, actions, outcomes).
    #[arg(long, short)]
    pub input: PathBuf,

    /// Emit the change-sets as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let cfg = super::load_config(&self.config)?;
        let run = super::load_run(&self.input)?;
        let auditor = Auditor::new(cfg);
        let root = auditor.config().checkout_directory.clone();

        let reconciliation = auditor
            .plan(&run)
            .with_context(|| format!("reconcile failed against '{}'", root.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reconciliation)?);
            return Ok(());
        }

        if reconciliation.is_empty() {
            println!("No changes for '{}'.", root.display());
            return Ok(());
        }

        if run.provider_exception.is_some() && !reconciliation.sync.is_empty() {
            println!(
                "{} provider exception set; {} sync change(s) would not be committed",
                "!".yellow().bold(),
                reconciliation.sync.len()
            );
        }

        for diff in diff_reconciliation(&root, &reconciliation)? {
            let label = match diff.kind {
                CommitKind::Sync => "sync".yellow().bold(),
                CommitKind::Valid => "valid".green().bold(),
            };
            println!("{label} {}", diff.path);
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.is_empty() && !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
