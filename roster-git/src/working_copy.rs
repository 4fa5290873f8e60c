//! Local checkout of the mirror repository.
//!
//! One remote, one branch, one directory. Every primitive except
//! [`WorkingCopy::clone_remote`] requires `dir/.git` to exist.

use std::path::{Path, PathBuf};

use crate::error::{io_err, GitError};
use crate::runner::{CommandRunner, RunOptions};

/// Result of a `git commit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// git reported an empty commit; the tree already matched.
    NothingToCommit,
}

/// The repository operations the transaction applier needs.
pub trait Vcs {
    /// Stage one mirror-relative path (additions, edits and removals alike).
    fn add(&self, path: &str) -> Result<(), GitError>;
    fn commit(&self, message: &str) -> Result<CommitOutcome, GitError>;
    fn push(&self) -> Result<(), GitError>;
}

#[derive(Debug, Clone)]
pub struct WorkingCopy {
    dir: PathBuf,
    remote_url: String,
    branch: String,
    runner: CommandRunner,
}

impl WorkingCopy {
    pub fn new(
        dir: impl Into<PathBuf>,
        remote_url: impl Into<String>,
        branch: impl Into<String>,
        runner: CommandRunner,
    ) -> Self {
        Self {
            dir: dir.into(),
            remote_url: remote_url.into(),
            branch: branch.into(),
            runner,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    /// Clone the remote into the (not yet existing) checkout directory.
    pub fn clone_remote(&self) -> Result<(), GitError> {
        if self.dir.exists() {
            return Err(GitError::AlreadyExists {
                path: self.dir.clone(),
            });
        }
        tracing::debug!("Cloning from {} to {}", self.remote_url, self.dir.display());
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        self.git(
            &["clone", "--branch", &self.branch, &self.remote_url, "."],
            RunOptions::ssh(),
        )?;
        Ok(())
    }

    /// Discard local changes and bring the configured branch up to the remote tip.
    pub fn pull(&self) -> Result<(), GitError> {
        self.validate()?;
        tracing::debug!("Pulling from {} to {}", self.remote_url, self.dir.display());
        self.git(&["reset", "--hard", "HEAD"], RunOptions::default())?;
        self.git(&["clean", "-f", "-d"], RunOptions::default())?;
        self.git(&["checkout", &self.branch], RunOptions::default())?;
        self.git(&["pull", "origin", &self.branch], RunOptions::ssh())?;
        Ok(())
    }

    /// Set the committer identity for this checkout.
    pub fn configure(&self, name: &str, email: &str) -> Result<(), GitError> {
        self.validate()?;
        tracing::debug!(
            "Configuring {} with name={name:?} email={email:?}",
            self.dir.display()
        );
        self.git(&["config", "user.name", name], RunOptions::default())?;
        self.git(&["config", "user.email", email], RunOptions::default())?;
        Ok(())
    }

    fn validate(&self) -> Result<(), GitError> {
        if self.dir.is_dir() && self.dir.join(".git").is_dir() {
            return Ok(());
        }
        Err(GitError::NotARepository {
            path: self.dir.clone(),
        })
    }

    fn git(&self, args: &[&str], opts: RunOptions) -> Result<crate::CommandOutput, GitError> {
        self.runner.run(&self.dir, args, opts)
    }
}

impl Vcs for WorkingCopy {
    fn add(&self, path: &str) -> Result<(), GitError> {
        self.validate()?;
        // `-A` so that a path removed from disk is staged as a deletion;
        // literal so `*`, `?` and `[` in a key never match sibling files.
        self.git(
            &["--literal-pathspecs", "add", "-A", "--", path],
            RunOptions::default(),
        )?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<CommitOutcome, GitError> {
        self.validate()?;
        let output = self.git(&["commit", "-m", message], RunOptions::default().allow_failure())?;
        if output.success() {
            return Ok(CommitOutcome::Committed);
        }
        let text = format!("{}{}", output.stdout, output.stderr);
        if text.contains("nothing to commit") || text.contains("nothing added to commit") {
            tracing::info!("Nothing to commit in {}; tree already up to date", self.dir.display());
            return Ok(CommitOutcome::NothingToCommit);
        }
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            tracing::warn!("[output] {line}");
        }
        Err(GitError::CommandFailed {
            command: format!("git commit -m {message:?}"),
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn push(&self) -> Result<(), GitError> {
        self.validate()?;
        tracing::debug!("Pushing to {} from {}", self.remote_url, self.dir.display());
        self.git(&["push", "origin", &self.branch], RunOptions::ssh())?;
        Ok(())
    }
}
