//! `roster run` — bootstrap the checkout, reconcile, commit and push.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use roster_sync::{ApplyReport, Auditor};

/// Arguments for `roster run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the audit configuration YAML.
    #[arg(long, short)]
    pub config: PathBuf,

    /// Path to the run file (desired state, actions, outcomes).
    #[arg(long, short)]
    pub input: PathBuf,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let cfg = super::load_config(&self.config)?;
        let run = super::load_run(&self.input)?;

        let mut auditor = Auditor::new(cfg);
        auditor
            .setup()
            .context("failed to prepare the mirror checkout")?;
        let summary = auditor.commit(&run).context("audit commit failed")?;

        print_report("sync", summary.sync.as_ref());
        if summary.sync_suppressed {
            println!(
                "! {} sync change(s) withheld due to provider exception",
                summary.reconciliation.sync.len()
            );
        }
        print_report("valid", summary.valid.as_ref());
        if summary.reconciliation.is_empty() {
            println!("✓ mirror already up to date");
        }

        log::debug!("Audit completed successfully");
        Ok(())
    }
}

fn print_report(label: &str, report: Option<&ApplyReport>) {
    let Some(report) = report else { return };
    if report.staged.is_empty() {
        println!("· {label}: nothing to stage");
        return;
    }
    let verb = if report.committed() {
        "committed"
    } else {
        "already recorded"
    };
    println!("✓ {label}: {} file(s) {verb}", report.staged.len());
    for path in &report.staged {
        println!("  ✎  {path}");
    }
}
