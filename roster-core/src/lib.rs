//! Roster core library — domain types, audit configuration, errors.
//!
//! Public API surface:
//! - [`types`] — entity keys, the [`Entity`] capability, actions and change-sets
//! - [`config`] — [`AuditConfig`] loading and validation
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{AuditConfig, PathEscaping};
pub use error::ConfigError;
pub use types::{
    Action, ActionKind, Change, ChangeSet, Entity, EntityKey, Group, Metadata, Outcomes, Scalar,
};
