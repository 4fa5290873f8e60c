//! `roster check-config` — validate configuration without running git.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

/// Arguments for `roster check-config`.
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Path to the audit configuration YAML.
    #[arg(long, short)]
    pub config: PathBuf,
}

impl CheckConfigArgs {
    pub fn run(self) -> Result<()> {
        let cfg = super::load_config(&self.config)?;
        println!(
            "✓ configuration OK: {} → {} ({})",
            cfg.checkout_directory.display(),
            cfg.remote_url(),
            cfg.branch
        );
        Ok(())
    }
}
