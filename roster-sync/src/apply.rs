//! Transaction applier: write one change-set, stage it, commit, push.
//!
//! ## Protocol
//!
//! 1. For each entry: delete (skipped when already absent) or write
//!    (`<dir>/.<name>.roster.tmp` then rename over the target).
//! 2. Stage every entry that changed the filesystem.
//! 3. Nothing staged → return; no empty commits, no push.
//! 4. Commit (`[sync commit] ` prefix for sync) and push. A commit git
//!    reports as empty counts as success and is still pushed.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use roster_core::{Change, ChangeSet};
use roster_git::{CommitOutcome, Vcs};

use crate::error::{io_err, AuditError};

/// Prefix added to sync commit messages.
pub const SYNC_PREFIX: &str = "[sync commit] ";

/// Which of the two per-run commits a change-set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitKind {
    Sync,
    Valid,
}

impl CommitKind {
    pub fn message(self, base: &str) -> String {
        match self {
            CommitKind::Sync => format!("{SYNC_PREFIX}{base}"),
            CommitKind::Valid => base.to_owned(),
        }
    }
}

impl fmt::Display for CommitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitKind::Sync => write!(f, "sync"),
            CommitKind::Valid => write!(f, "valid"),
        }
    }
}

/// Outcome of applying one change-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub kind: CommitKind,
    /// Paths that changed on disk and were staged.
    pub staged: Vec<String>,
    /// `None` when nothing was staged and no commit was attempted.
    pub commit: Option<CommitOutcome>,
}

impl ApplyReport {
    pub fn committed(&self) -> bool {
        self.commit == Some(CommitOutcome::Committed)
    }
}

/// Apply `changes` under `root` and record them through `vcs`.
pub fn apply_changes<V: Vcs + ?Sized>(
    vcs: &V,
    root: &Path,
    changes: &ChangeSet,
    kind: CommitKind,
    message: &str,
) -> Result<ApplyReport, AuditError> {
    let mut staged = Vec::new();

    for (filename, change) in changes {
        let target = root.join(filename);
        let touched = match change {
            Change::Delete => remove_if_present(&target)?,
            Change::Write(content) => {
                write_file(&target, content)?;
                true
            }
        };
        if touched {
            vcs.add(filename)?;
            staged.push(filename.clone());
        }
    }

    if staged.is_empty() {
        tracing::debug!("No {kind} changes touched the checkout; skipping commit");
        return Ok(ApplyReport {
            kind,
            staged,
            commit: None,
        });
    }

    let outcome = vcs.commit(&kind.message(message))?;
    if outcome == CommitOutcome::NothingToCommit {
        tracing::info!("{kind} commit was empty; pushing any earlier unpushed commits");
    }
    vcs.push()?;

    Ok(ApplyReport {
        kind,
        staged,
        commit: Some(outcome),
    })
}

/// Remove a file, treating an already-absent file as a no-op.
///
/// Two runs may race to remove the same file; only the one that actually
/// removed it reports a change.
fn remove_if_present(target: &Path) -> Result<bool, AuditError> {
    if !target.exists() {
        tracing::debug!("Already absent: {}", target.display());
        return Ok(false);
    }
    match std::fs::remove_file(target) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_err(target, err)),
    }
}

fn write_file(target: &Path, content: &str) -> Result<(), AuditError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = tmp_path(target);
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(target, e));
    }
    Ok(())
}

/// Sibling temp file; dot-prefixed so mirror scans never see it.
fn tmp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.roster.tmp"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;

    use roster_git::GitError;
    use tempfile::TempDir;

    /// Records every repository call instead of running git.
    #[derive(Default)]
    pub(crate) struct RecordingVcs {
        pub calls: RefCell<Vec<String>>,
        pub empty_commit: bool,
    }

    impl Vcs for RecordingVcs {
        fn add(&self, path: &str) -> Result<(), GitError> {
            self.calls.borrow_mut().push(format!("add {path}"));
            Ok(())
        }

        fn commit(&self, message: &str) -> Result<CommitOutcome, GitError> {
            self.calls.borrow_mut().push(format!("commit {message}"));
            if self.empty_commit {
                Ok(CommitOutcome::NothingToCommit)
            } else {
                Ok(CommitOutcome::Committed)
            }
        }

        fn push(&self) -> Result<(), GitError> {
            self.calls.borrow_mut().push("push".to_owned());
            Ok(())
        }
    }

    #[test]
    fn empty_change_set_never_touches_git() {
        let root = TempDir::new().unwrap();
        let vcs = RecordingVcs::default();
        let report =
            apply_changes(&vcs, root.path(), &ChangeSet::new(), CommitKind::Valid, "msg").unwrap();
        assert!(report.staged.is_empty());
        assert_eq!(report.commit, None);
        assert!(vcs.calls.borrow().is_empty());
    }

    #[test]
    fn redundant_deletes_are_skipped_without_commit() {
        let root = TempDir::new().unwrap();
        let vcs = RecordingVcs::default();
        let mut changes = ChangeSet::new();
        changes.insert("dc=net/cn=gone".into(), Change::Delete);
        let report = apply_changes(&vcs, root.path(), &changes, CommitKind::Sync, "msg").unwrap();
        assert!(report.staged.is_empty());
        assert!(vcs.calls.borrow().is_empty(), "no add/commit/push for absent file");
    }

    #[test]
    fn writes_and_deletes_are_staged_then_committed_and_pushed() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("dc=net")).unwrap();
        fs::write(root.path().join("dc=net/cn=old"), "x\n").unwrap();

        let mut changes = ChangeSet::new();
        changes.insert("dc=net/cn=old".into(), Change::Delete);
        changes.insert("dc=net/ou=Groups/cn=new".into(), Change::Write("alice\n".into()));

        let vcs = RecordingVcs::default();
        let report = apply_changes(&vcs, root.path(), &changes, CommitKind::Valid, "audit").unwrap();

        assert!(report.committed());
        assert!(!root.path().join("dc=net/cn=old").exists());
        assert_eq!(
            fs::read_to_string(root.path().join("dc=net/ou=Groups/cn=new")).unwrap(),
            "alice\n"
        );
        assert_eq!(
            *vcs.calls.borrow(),
            vec![
                "add dc=net/cn=old",
                "add dc=net/ou=Groups/cn=new",
                "commit audit",
                "push"
            ]
        );
    }

    #[test]
    fn sync_commits_are_prefixed() {
        let root = TempDir::new().unwrap();
        let mut changes = ChangeSet::new();
        changes.insert("cn=a".into(), Change::Write("a\n".into()));
        let vcs = RecordingVcs::default();
        apply_changes(&vcs, root.path(), &changes, CommitKind::Sync, "audit").unwrap();
        assert!(vcs.calls.borrow().contains(&"commit [sync commit] audit".to_owned()));
    }

    #[test]
    fn empty_commit_is_success_and_still_pushes() {
        let root = TempDir::new().unwrap();
        let mut changes = ChangeSet::new();
        changes.insert("cn=a".into(), Change::Write("a\n".into()));
        let vcs = RecordingVcs {
            empty_commit: true,
            ..RecordingVcs::default()
        };
        let report = apply_changes(&vcs, root.path(), &changes, CommitKind::Valid, "m").unwrap();
        assert_eq!(report.commit, Some(CommitOutcome::NothingToCommit));
        assert!(!report.committed());
        assert_eq!(*vcs.calls.borrow(), vec!["add cn=a", "commit m", "push"]);
    }

    #[test]
    fn overwrite_leaves_no_temp_file() {
        let root = TempDir::new().unwrap();
        let target = root.path().join("cn=a");
        fs::write(&target, "old\n").unwrap();
        write_file(&target, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");
        assert!(!tmp_path(&target).exists());
        assert_eq!(
            tmp_path(&target).file_name().unwrap().to_string_lossy(),
            ".cn=a.roster.tmp"
        );
    }
}
