//! Full runs against a bare repository on disk standing in for the remote.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use roster_core::{config::RawConfig, Action, AuditConfig, EntityKey, Group};
use roster_sync::{AuditRun, Auditor};
use tempfile::TempDir;

const MESSAGE: &str = "audit run";

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git command");
    assert!(
        output.status.success(),
        "git {:?} failed:\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// `<root>/remote/kittens/audit.git` seeded with one README.md commit on master.
fn bare_remote(root: &Path) -> PathBuf {
    let seed = root.join("seed");
    fs::create_dir_all(&seed).unwrap();
    git(&seed, &["init", "-q"]);
    git(&seed, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    git(&seed, &["config", "user.name", "Seed"]);
    git(&seed, &["config", "user.email", "seed@example.net"]);
    fs::write(seed.join("README.md"), "audit mirror\n").unwrap();
    git(&seed, &["add", "README.md"]);
    git(&seed, &["commit", "-q", "-m", "initialize repo"]);

    let owner = root.join("remote").join("kittens");
    fs::create_dir_all(&owner).unwrap();
    git(&owner, &["clone", "-q", "--bare", seed.to_str().unwrap(), "audit.git"]);
    owner.join("audit.git")
}

fn config(root: &Path) -> AuditConfig {
    AuditConfig::from_raw(RawConfig {
        checkout_directory: Some(root.join("checkout")),
        commit_message: Some(MESSAGE.into()),
        git_name: Some("Audit Bot".into()),
        git_email: Some("audit@example.net".into()),
        repo: Some("kittens/audit".into()),
        sshkey: Some("YXNkZmFzZmRhc2Rm".into()),
        remote_base: Some(format!("{}/", root.join("remote").display())),
        ..RawConfig::default()
    })
    .expect("config")
}

fn subjects(remote: &Path) -> Vec<String> {
    git(remote, &["log", "--format=%s", "master"])
        .lines()
        .map(str::to_owned)
        .collect()
}

fn show(remote: &Path, path: &str) -> String {
    git(remote, &["show", &format!("master:{path}")])
}

fn key(raw: &str) -> EntityKey {
    EntityKey::from(raw)
}

fn run_once(root: &Path, run: &AuditRun) -> roster_sync::CommitSummary {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut auditor = Auditor::new(config(root));
    auditor.setup().expect("setup");
    auditor.commit(run).expect("commit")
}

#[test]
fn first_run_clones_and_second_identical_run_is_a_noop() {
    let root = TempDir::new().unwrap();
    let remote = bare_remote(root.path());

    let mut run = AuditRun::default();
    run.desired
        .insert(key("cn=ops,ou=Groups,dc=net"), Group::new(["Bob", "alice"]));
    run.desired.insert(
        key("cn=dev,ou=Groups,dc=net"),
        Group::new(["carol"]).with_metadata("team_id", 7),
    );
    for k in ["cn=ops,ou=Groups,dc=net", "cn=dev,ou=Groups,dc=net"] {
        run.actions.push(Action::add(k));
        run.succeeded.insert(key(k));
    }

    let summary = run_once(root.path(), &run);
    assert!(summary.sync.is_none());
    assert!(summary.valid.as_ref().is_some_and(|r| r.committed()));
    assert_eq!(subjects(&remote), vec![MESSAGE, "initialize repo"]);
    assert_eq!(show(&remote, "dc=net/ou=Groups/cn=ops"), "alice\nbob");
    assert_eq!(show(&remote, "dc=net/ou=Groups/cn=dev"), "carol\nmetadata_team_id=7");

    // Same desired state, no actions: pull, reconcile, nothing to do.
    let second = AuditRun {
        desired: run.desired.clone(),
        ..AuditRun::default()
    };
    let summary = run_once(root.path(), &second);
    assert!(summary.reconciliation.is_empty());
    assert_eq!(subjects(&remote).len(), 2);
}

#[test]
fn manual_edit_is_corrected_in_sync_commit_before_valid_commit() {
    let root = TempDir::new().unwrap();
    let remote = bare_remote(root.path());

    let mut first = AuditRun::default();
    first.desired.insert(key("cn=ops,dc=net"), Group::new(["alice"]));
    first.desired.insert(key("cn=gone,dc=net"), Group::new(["zed"]));
    run_once(root.path(), &first);
    assert_eq!(subjects(&remote), vec!["[sync commit] audit run", "initialize repo"]);

    // Someone edits the mirror by hand and pushes.
    let other = root.path().join("other");
    git(root.path(), &["clone", "-q", remote.to_str().unwrap(), "other"]);
    git(&other, &["config", "user.name", "Human"]);
    git(&other, &["config", "user.email", "human@example.net"]);
    fs::write(other.join("dc=net/cn=ops"), "mallory\n").unwrap();
    git(&other, &["commit", "-q", "-am", "manual edit"]);
    git(&other, &["push", "-q", "origin", "master"]);

    // This run: ops gains bob, gone is deleted.
    let mut second = AuditRun::default();
    second.desired.insert(key("cn=ops,dc=net"), Group::new(["alice", "bob"]));
    second.actions.push(Action::update("cn=ops,dc=net", Group::new(["alice"])));
    second.actions.push(Action::delete("cn=gone,dc=net", Group::new(["zed"])));
    second.succeeded.insert(key("cn=ops,dc=net"));
    second.succeeded.insert(key("cn=gone,dc=net"));

    let summary = run_once(root.path(), &second);
    assert_eq!(summary.reconciliation.sync.len(), 1);
    assert_eq!(summary.reconciliation.valid.len(), 2);
    assert_eq!(
        subjects(&remote),
        vec![
            MESSAGE,
            "[sync commit] audit run",
            "manual edit",
            "[sync commit] audit run",
            "initialize repo"
        ]
    );
    assert_eq!(git(&remote, &["show", "master~1:dc=net/cn=ops"]), "alice");
    assert_eq!(show(&remote, "dc=net/cn=ops"), "alice\nbob");
    let tree = git(&remote, &["ls-tree", "-r", "--name-only", "master"]);
    assert_eq!(tree, "README.md\ndc=net/cn=ops");
}

#[test]
fn provider_exception_withholds_sync_commit() {
    let root = TempDir::new().unwrap();
    let remote = bare_remote(root.path());

    let mut run = AuditRun::default();
    run.desired.insert(key("cn=stale,dc=net"), Group::new(["alice"]));
    run.desired.insert(key("cn=new,dc=net"), Group::new(["bob"]));
    run.actions.push(Action::add("cn=new,dc=net"));
    run.succeeded.insert(key("cn=new,dc=net"));
    run.provider_exception = Some("directory unavailable".into());

    let summary = run_once(root.path(), &run);
    assert!(summary.sync_suppressed);
    assert_eq!(subjects(&remote), vec![MESSAGE, "initialize repo"]);
    let tree = git(&remote, &["ls-tree", "-r", "--name-only", "master"]);
    assert_eq!(tree, "README.md\ndc=net/cn=new");
}
