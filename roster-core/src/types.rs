//! Domain types for the audit mirror.
//!
//! Entities are supplied wholesale by the caller each run; nothing in this
//! workspace mutates them. Change-sets are keyed by mirror-relative paths
//! using `/` as separator regardless of platform, since they are handed to
//! git verbatim.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A hierarchical entity identifier such as `cn=ops,ou=Groups,dc=example,dc=net`.
///
/// Components are separated by `,`, least-specific last. A backslash escapes
/// a literal comma inside a component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub String);

impl EntityKey {
    /// Split into components on unescaped commas, most-specific first.
    ///
    /// Escape sequences are kept verbatim so that joining the components
    /// with `,` reproduces the original key.
    pub fn components(&self) -> Vec<&str> {
        let mut parts = Vec::new();
        let mut start = 0;
        let mut escaped = false;
        for (idx, ch) in self.0.char_indices() {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                ',' => {
                    parts.push(&self.0[start..idx]);
                    start = idx + 1;
                }
                _ => {}
            }
        }
        parts.push(&self.0[start..]);
        parts
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntityKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => b.fmt(f),
            Scalar::Int(i) => i.fmt(f),
            Scalar::Float(x) => x.fmt(f),
            Scalar::Str(s) => s.fmt(f),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_owned())
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

/// Key/value metadata attached to an entity.
pub type Metadata = BTreeMap<String, Scalar>;

/// The two capabilities the audit mirror needs from a group-like object.
pub trait Entity {
    /// The member identifiers, before any template rewriting or lower-casing.
    fn members(&self) -> &BTreeSet<String>;

    /// The entity's metadata, or `None` when the entity carries none at all.
    fn metadata(&self) -> Option<&Metadata>;
}

/// A plain group: a member set plus optional metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub members: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Group {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            metadata: None,
        }
    }

    /// Builder-style metadata insertion.
    pub fn with_metadata(mut self, key: &str, value: impl Into<Scalar>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.to_owned(), value.into());
        self
    }
}

impl Entity for Group {
    fn members(&self) -> &BTreeSet<String> {
        &self.members
    }

    fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The kind of change requested against the live directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Add => write!(f, "add"),
            ActionKind::Update => write!(f, "update"),
            ActionKind::Delete => write!(f, "delete"),
        }
    }
}

/// One requested change to an entity for this run.
///
/// `existing` is the entity as it was before the change; it is required for
/// [`ActionKind::Update`] and [`ActionKind::Delete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: Deserialize<'de>"))]
pub struct Action<E = Group> {
    pub key: EntityKey,
    pub kind: ActionKind,
    #[serde(default)]
    pub existing: Option<E>,
}

impl<E> Action<E> {
    pub fn add(key: impl Into<EntityKey>) -> Self {
        Self {
            key: key.into(),
            kind: ActionKind::Add,
            existing: None,
        }
    }

    pub fn update(key: impl Into<EntityKey>, existing: E) -> Self {
        Self {
            key: key.into(),
            kind: ActionKind::Update,
            existing: Some(existing),
        }
    }

    pub fn delete(key: impl Into<EntityKey>, existing: E) -> Self {
        Self {
            key: key.into(),
            kind: ActionKind::Delete,
            existing: Some(existing),
        }
    }
}

/// Keys whose live-system action succeeded this run.
pub type Outcomes = BTreeSet<EntityKey>;

// ---------------------------------------------------------------------------
// Change-sets
// ---------------------------------------------------------------------------

/// A pending effect on one mirror file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op", content = "content")]
pub enum Change {
    /// Replace the file's full content (creating it if needed).
    Write(String),
    /// Remove the file.
    Delete,
}

/// Mirror-relative path → pending change, iterated in path order.
pub type ChangeSet = BTreeMap<String, Change>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_components_split_on_commas() {
        let key = EntityKey::from("cn=ops,ou=Groups,dc=example,dc=net");
        assert_eq!(
            key.components(),
            vec!["cn=ops", "ou=Groups", "dc=example", "dc=net"]
        );
    }

    #[test]
    fn key_components_keep_escaped_commas() {
        let key = EntityKey::from(r"cn=Smith\, J,ou=People");
        assert_eq!(key.components(), vec![r"cn=Smith\, J", "ou=People"]);
    }

    #[test]
    fn single_component_key() {
        assert_eq!(EntityKey::from("cn=solo").components(), vec!["cn=solo"]);
    }

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::from("team").to_string(), "team");
        assert_eq!(Scalar::from(7).to_string(), "7");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
    }

    #[test]
    fn group_without_metadata_reports_none() {
        let group = Group::new(["alice"]);
        assert!(group.metadata().is_none());
        let group = group.with_metadata("team_id", 4);
        assert_eq!(group.metadata().map(|m| m.len()), Some(1));
    }

    #[test]
    fn action_yaml_roundtrip() {
        let yaml = "key: cn=a,dc=net\nkind: update\nexisting:\n  members: [bob]\n";
        let action: Action = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(action.kind, ActionKind::Update);
        assert_eq!(action.existing, Some(Group::new(["bob"])));
        let add: Action = serde_yaml::from_str("key: cn=b\nkind: add\n").expect("parse");
        assert!(add.existing.is_none());
    }
}
