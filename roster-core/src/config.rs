//! Audit configuration.
//!
//! # File format
//!
//! ```yaml
//! checkout_directory: /var/lib/roster/checkout
//! commit_message: "roster audit run"
//! git_name: Audit Bot
//! git_email: audit@example.net
//! repo: example/access-audit
//! sshkey: LS0tLS1CRUdJTi...        # base64 of the private key
//! remote_base: "git@github.com:"   # optional
//! branch: master                   # optional
//! member_template: "uid=%KEY%,ou=People,dc=example,dc=net"  # optional
//! sentinel: README.md              # optional
//! escaping: strict                 # optional: strict | percent
//! ```
//!
//! The file is parsed into a loose [`RawConfig`] first so that a missing key
//! is reported by name instead of as a generic YAML error.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default remote prefix; `repo` and `.git` are appended.
pub const DEFAULT_REMOTE_BASE: &str = "git@github.com:";
/// Default branch pushed to.
pub const DEFAULT_BRANCH: &str = "master";
/// Default reserved file that reconciliation never touches.
pub const DEFAULT_SENTINEL: &str = "README.md";

/// How entity key components that contain a path separator are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathEscaping {
    /// Reject components containing `/`, or that are empty, `.` or `..`.
    #[default]
    Strict,
    /// Percent-encode `%` and `/` inside each path segment.
    Percent,
}

/// Configuration as written on disk; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    pub checkout_directory: Option<PathBuf>,
    pub commit_message: Option<String>,
    pub git_name: Option<String>,
    pub git_email: Option<String>,
    pub repo: Option<String>,
    pub sshkey: Option<String>,
    pub remote_base: Option<String>,
    pub branch: Option<String>,
    pub member_template: Option<String>,
    pub sentinel: Option<String>,
    #[serde(default)]
    pub escaping: PathEscaping,
}

/// Validated audit configuration, passed explicitly to every component.
#[derive(Clone)]
pub struct AuditConfig {
    pub checkout_directory: PathBuf,
    pub commit_message: String,
    pub git_name: String,
    pub git_email: String,
    /// `organization/reponame`.
    pub repo: String,
    /// Decoded private key material.
    pub sshkey: Vec<u8>,
    pub remote_base: String,
    pub branch: String,
    /// Pattern in which `%KEY%` is replaced by each member before lower-casing.
    pub member_template: Option<String>,
    pub sentinel: String,
    pub escaping: PathEscaping,
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("checkout_directory", &self.checkout_directory)
            .field("commit_message", &self.commit_message)
            .field("git_name", &self.git_name)
            .field("git_email", &self.git_email)
            .field("repo", &self.repo)
            .field("sshkey", &"<redacted>")
            .field("remote_base", &self.remote_base)
            .field("branch", &self.branch)
            .field("member_template", &self.member_template)
            .field("sentinel", &self.sentinel)
            .field("escaping", &self.escaping)
            .finish()
    }
}

impl AuditConfig {
    /// Validate a raw configuration.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let checkout_directory = raw
            .checkout_directory
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingKey("checkout_directory"))?;
        let commit_message = required(raw.commit_message, "commit_message")?;
        let git_name = required(raw.git_name, "git_name")?;
        let git_email = required(raw.git_email, "git_email")?;
        let repo = required(raw.repo, "repo")?;
        let sshkey = required(raw.sshkey, "sshkey")?;

        if !is_org_slash_repo(&repo) {
            return Err(ConfigError::InvalidRepo(repo));
        }

        // Tolerate line-wrapped base64 as produced by `base64 -w 76`.
        let compact: String = sshkey.chars().filter(|c| !c.is_whitespace()).collect();
        let sshkey = STANDARD.decode(compact)?;

        Ok(Self {
            checkout_directory,
            commit_message,
            git_name,
            git_email,
            repo,
            sshkey,
            remote_base: raw
                .remote_base
                .unwrap_or_else(|| DEFAULT_REMOTE_BASE.to_owned()),
            branch: raw.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_owned()),
            member_template: raw.member_template,
            sentinel: raw.sentinel.unwrap_or_else(|| DEFAULT_SENTINEL.to_owned()),
            escaping: raw.escaping,
        })
    }

    /// Parse and validate YAML text. `origin` is only used in error messages.
    pub fn from_yaml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::from_raw(raw)
    }

    /// The full remote URL: `remote_base + repo + ".git"`.
    pub fn remote_url(&self) -> String {
        format!("{}{}.git", self.remote_base, self.repo)
    }
}

/// Load and validate the configuration file at `path`.
pub fn load_at(path: &Path) -> Result<AuditConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    AuditConfig::from_yaml_str(&text, path)
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingKey(key))
}

fn is_org_slash_repo(repo: &str) -> bool {
    match repo.split_once('/') {
        Some((org, name)) => !org.is_empty() && !name.is_empty() && !name.contains('/'),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
