//! # roster-sync
//!
//! Reconciliation of desired entity state against the git mirror, and the
//! transactional commit of the resulting change-sets.
//!
//! Build an [`Auditor`] from a validated config, call [`Auditor::setup`] to
//! clone or pull the checkout, then [`Auditor::commit`] with the run's
//! desired state, actions and outcomes.

pub mod apply;
pub mod auditor;
pub mod codec;
pub mod diff;
pub mod error;
pub mod reconcile;
pub mod serializer;

pub use apply::{apply_changes, ApplyReport, CommitKind};
pub use auditor::{AuditRun, Auditor, CommitSummary};
pub use codec::{CodecError, PathCodec};
pub use diff::{diff_reconciliation, FileDiff};
pub use error::AuditError;
pub use reconcile::{Reconciler, Reconciliation};
pub use serializer::Serializer;
