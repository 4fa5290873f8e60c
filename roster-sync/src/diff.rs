//! Unified diff preview of a reconciliation, for `roster plan`.

use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use similar::TextDiff;

use roster_core::{Change, ChangeSet};

use crate::apply::CommitKind;
use crate::error::{io_err, AuditError};
use crate::reconcile::Reconciliation;

/// A single pending file change and its diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub kind: CommitKind,
    pub path: String,
    pub unified_diff: String,
}

/// Diff every pending change against what the file will hold just before it
/// is applied: the checkout for sync changes, and the post-sync content for
/// valid changes.
///
/// No files are written.
pub fn diff_reconciliation(
    root: &Path,
    reconciliation: &Reconciliation,
) -> Result<Vec<FileDiff>, AuditError> {
    let mut diffs = Vec::new();
    for (path, change) in &reconciliation.sync {
        let before = read_existing_or_empty(&root.join(path))?;
        diffs.push(file_diff(CommitKind::Sync, path, &before, change));
    }
    for (path, change) in &reconciliation.valid {
        let before = match after_sync(&reconciliation.sync, path) {
            Some(content) => content,
            None => read_existing_or_empty(&root.join(path))?,
        };
        diffs.push(file_diff(CommitKind::Valid, path, &before, change));
    }
    Ok(diffs)
}

fn after_sync(sync: &ChangeSet, path: &str) -> Option<String> {
    match sync.get(path)? {
        Change::Write(content) => Some(content.clone()),
        Change::Delete => Some(String::new()),
    }
}

fn file_diff(kind: CommitKind, path: &str, before: &str, change: &Change) -> FileDiff {
    let after = match change {
        Change::Write(content) => content.as_str(),
        Change::Delete => "",
    };
    let old_header = format!("a/{path}");
    let new_header = format!("b/{path}");
    let unified_diff = TextDiff::from_lines(before, after)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();
    FileDiff {
        kind,
        path: path.to_owned(),
        unified_diff,
    }
}

fn read_existing_or_empty(path: &Path) -> Result<String, AuditError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}
