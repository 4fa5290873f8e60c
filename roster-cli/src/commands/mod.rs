pub mod check_config;
pub mod plan;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};

use roster_core::{config, AuditConfig};
use roster_sync::AuditRun;

/// Load and validate the audit configuration.
pub(crate) fn load_config(path: &Path) -> Result<AuditConfig> {
    config::load_at(path).with_context(|| format!("invalid configuration '{}'", path.display()))
}

/// Load a run file: desired state, actions, outcomes and provider exception.
pub(crate) fn load_run(path: &Path) -> Result<AuditRun> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read run file '{}'", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse run file '{}'", path.display()))
}
