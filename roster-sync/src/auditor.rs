//! Run driver: bootstrap the checkout, reconcile, then commit.
//!
//! ```text
//! Auditor::setup   clone (no checkout yet) or pull, then set identity
//! Auditor::commit  reconcile → sync commit (unless provider exception) → valid commit
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use roster_core::{Action, AuditConfig, Entity, EntityKey, Group, Outcomes};
use roster_git::{CommandRunner, Vcs, WorkingCopy};

use crate::apply::{apply_changes, ApplyReport, CommitKind};
use crate::error::AuditError;
use crate::reconcile::{Reconciler, Reconciliation};

/// Everything the orchestrator hands over for one run.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "E: Deserialize<'de>"))]
pub struct AuditRun<E = Group> {
    /// Desired post-run state, keyed by entity.
    #[serde(default)]
    pub desired: BTreeMap<EntityKey, E>,
    /// Actions attempted against the live directory this run.
    #[serde(default)]
    pub actions: Vec<Action<E>>,
    /// Keys whose action succeeded.
    #[serde(default)]
    pub succeeded: Outcomes,
    /// Set when a provider failed while applying actions.
    #[serde(default)]
    pub provider_exception: Option<String>,
}

impl<E> Default for AuditRun<E> {
    fn default() -> Self {
        Self {
            desired: BTreeMap::new(),
            actions: Vec::new(),
            succeeded: Outcomes::new(),
            provider_exception: None,
        }
    }
}

/// What a commit call did.
#[derive(Debug, Clone)]
pub struct CommitSummary {
    pub reconciliation: Reconciliation,
    pub sync: Option<ApplyReport>,
    pub valid: Option<ApplyReport>,
    /// Sync changes existed but were withheld because of a provider exception.
    pub sync_suppressed: bool,
}

#[derive(Debug)]
pub struct Auditor {
    config: AuditConfig,
    reconciler: Reconciler,
    runner: CommandRunner,
    repo: Option<WorkingCopy>,
}

impl Auditor {
    pub fn new(config: AuditConfig) -> Self {
        let reconciler = Reconciler::from_config(&config);
        let runner = CommandRunner::new(config.sshkey.clone());
        Self {
            config,
            reconciler,
            runner,
            repo: None,
        }
    }

    /// Replace the command runner (alternate git or ssh binaries).
    pub fn with_runner(mut self, runner: CommandRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Clone the mirror if the checkout directory does not exist yet,
    /// otherwise reset and pull it; then configure the committer identity.
    pub fn setup(&mut self) -> Result<(), AuditError> {
        let dir = &self.config.checkout_directory;
        tracing::debug!("Preparing {}", dir.display());

        let repo = WorkingCopy::new(
            dir,
            self.config.remote_url(),
            &self.config.branch,
            self.runner.clone(),
        );
        if dir.is_dir() {
            repo.pull()?;
        } else {
            repo.clone_remote()?;
        }
        repo.configure(&self.config.git_name, &self.config.git_email)?;

        tracing::debug!("Directory {} prepared", dir.display());
        self.repo = Some(repo);
        Ok(())
    }

    /// Reconcile against the checkout without writing anything.
    pub fn plan<E: Entity>(&self, run: &AuditRun<E>) -> Result<Reconciliation, AuditError> {
        self.reconciler
            .reconcile(&run.desired, &run.actions, &run.succeeded)
    }

    /// Reconcile and commit through the working copy prepared by [`Auditor::setup`].
    pub fn commit<E: Entity>(&self, run: &AuditRun<E>) -> Result<CommitSummary, AuditError> {
        let repo = self.repo.as_ref().ok_or(AuditError::NotPrepared)?;
        self.commit_with(repo, run)
    }

    /// Reconcile and commit through any [`Vcs`] rooted at the checkout directory.
    pub fn commit_with<V: Vcs + ?Sized, E: Entity>(
        &self,
        vcs: &V,
        run: &AuditRun<E>,
    ) -> Result<CommitSummary, AuditError> {
        let reconciliation = self.plan(run)?;
        let root = &self.config.checkout_directory;
        let message = &self.config.commit_message;

        let mut summary = CommitSummary {
            sync: None,
            valid: None,
            sync_suppressed: false,
            reconciliation,
        };

        let sync = &summary.reconciliation.sync;
        if !sync.is_empty() {
            if run.provider_exception.is_some() {
                tracing::warn!(
                    "Not committing {} unrecognized change(s) due to provider exception",
                    sync.len()
                );
                summary.sync_suppressed = true;
            } else {
                tracing::warn!("Sync changes required: count={}", sync.len());
                summary.sync = Some(apply_changes(vcs, root, sync, CommitKind::Sync, message)?);
            }
        }

        let valid = &summary.reconciliation.valid;
        if !valid.is_empty() {
            tracing::debug!("Committing {} change(s) to git repository", valid.len());
            summary.valid = Some(apply_changes(vcs, root, valid, CommitKind::Valid, message)?);
        } else if summary.reconciliation.sync.is_empty() {
            tracing::debug!("No changes to git repository");
        }

        Ok(summary)
    }
}
