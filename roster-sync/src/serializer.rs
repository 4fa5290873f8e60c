//! Canonical mirror file format.
//!
//! ```text
//! uid=alice,ou=people,dc=example,dc=net
//! uid=bob,ou=people,dc=example,dc=net
//! metadata_team_id=4
//! metadata_team_name=ops
//! ```
//!
//! Members are lower-cased and sorted, one per line. An empty member set is
//! written as the single line `# No members`. Metadata follows as sorted
//! `metadata_<key>=<value>` lines and is left out entirely when there is none.
//! Serialized text equality is the only notion of "file matches" used by the
//! reconciler.

use std::collections::BTreeSet;

use roster_core::Entity;

/// Written in place of the member list when an entity has no members.
pub const NO_MEMBERS: &str = "# No members\n";

/// Metadata key that is never written to the mirror.
pub const RESERVED_METADATA_KEY: &str = "_filename";

/// Placeholder substituted by each member in a member template.
pub const TEMPLATE_PLACEHOLDER: &str = "%KEY%";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Serializer {
    member_template: Option<String>,
}

impl Serializer {
    pub fn new(member_template: Option<String>) -> Self {
        Self { member_template }
    }

    /// Full file content for one entity.
    pub fn contents<E: Entity + ?Sized>(&self, entity: &E) -> String {
        let mut text = self.members_text(entity);
        text.push_str(&self.metadata_text(entity));
        text
    }

    pub fn members_text<E: Entity + ?Sized>(&self, entity: &E) -> String {
        let members = entity.members();
        if members.is_empty() {
            return NO_MEMBERS.to_owned();
        }
        let lines: BTreeSet<String> = members
            .iter()
            .map(|member| match &self.member_template {
                Some(template) => template.replace(TEMPLATE_PLACEHOLDER, member).to_lowercase(),
                None => member.to_lowercase(),
            })
            .collect();
        let mut text = lines.into_iter().collect::<Vec<_>>().join("\n");
        text.push('\n');
        text
    }

    pub fn metadata_text<E: Entity + ?Sized>(&self, entity: &E) -> String {
        let Some(metadata) = entity.metadata() else {
            return String::new();
        };
        let mut lines: Vec<String> = metadata
            .iter()
            .filter(|(key, _)| key.as_str() != RESERVED_METADATA_KEY)
            .map(|(key, value)| format!("metadata_{}={value}", key.to_lowercase()))
            .collect();
        if lines.is_empty() {
            return String::new();
        }
        lines.sort();
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::Group;

    #[test]
    fn members_are_lowercased_and_sorted() {
        let group = Group::new(["Zed", "alice", "Bob"]);
        assert_eq!(Serializer::default().members_text(&group), "alice\nbob\nzed\n");
    }

    #[test]
    fn empty_members_use_sentinel_line() {
        assert_eq!(Serializer::default().contents(&Group::default()), "# No members\n");
    }

    #[test]
    fn template_is_applied_before_lowercasing() {
        let ser = Serializer::new(Some("uid=%KEY%,ou=People,dc=Kittens,dc=net".into()));
        let group = Group::new(["Russian-Blue", "snowshoe"]);
        assert_eq!(
            ser.members_text(&group),
            "uid=russian-blue,ou=people,dc=kittens,dc=net\nuid=snowshoe,ou=people,dc=kittens,dc=net\n"
        );
    }

    #[test]
    fn case_variants_collapse_to_one_line() {
        let group = Group::new(["Alice", "alice"]);
        assert_eq!(Serializer::default().members_text(&group), "alice\n");
    }

    #[test]
    fn metadata_is_sorted_and_reserved_key_dropped() {
        let group = Group::new(["a"])
            .with_metadata("team_name", "group1")
            .with_metadata("_filename", "/path/to/group1.txt")
            .with_metadata("Cat_Color", "brown")
            .with_metadata("team_id", 1);
        assert_eq!(
            Serializer::default().metadata_text(&group),
            "metadata_cat_color=brown\nmetadata_team_id=1\nmetadata_team_name=group1\n"
        );
    }

    #[test]
    fn no_metadata_and_only_reserved_metadata_are_both_empty() {
        let ser = Serializer::default();
        assert_eq!(ser.metadata_text(&Group::new(["a"])), "");
        let only_reserved = Group::new(["a"]).with_metadata("_filename", "x");
        assert_eq!(ser.metadata_text(&only_reserved), "");
    }

    #[test]
    fn contents_joins_members_and_metadata() {
        let group = Group::new(["uid=snowshoe,dc=kittens,dc=net"])
            .with_metadata("team_id", 3)
            .with_metadata("team_name", "group3");
        assert_eq!(
            Serializer::default().contents(&group),
            "uid=snowshoe,dc=kittens,dc=net\nmetadata_team_id=3\nmetadata_team_name=group3\n"
        );
    }

    #[test]
    fn output_is_independent_of_insertion_order() {
        let a = Group::new(["c", "a", "b"]).with_metadata("y", 1).with_metadata("x", 2);
        let b = Group::new(["b", "c", "a"]).with_metadata("x", 2).with_metadata("y", 1);
        let ser = Serializer::default();
        assert_eq!(ser.contents(&a), ser.contents(&b));
    }
}
