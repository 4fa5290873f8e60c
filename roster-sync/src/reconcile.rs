//! Classification of every entity into sync changes and valid changes.
//!
//! A *sync* change repairs the mirror so that it shows what the live
//! directory held before this run's action. A *valid* change records this
//! run's authorized, successful mutation. When one key needs both, the sync
//! entry carries the prior content and the valid entry the new content; they
//! land in separate commits.
//!
//! | action | ok? | file matches | file differs | no file |
//! |--------|-----|--------------|--------------|---------|
//! | none   |  -  | -            | sync=desired | sync=desired (unless no members) |
//! | add    | yes | sync=delete, valid=desired | sync=delete, valid=desired | valid=desired |
//! | update | yes | valid=desired | sync=prior, valid=desired | sync=prior, valid=desired |
//! | delete | yes | valid=delete | sync=prior, valid=delete | sync=prior, valid=delete |
//! | any    | no  | skip | skip | skip |
//!
//! For add and "none" the file is compared to the desired content; for update
//! and delete, to the prior content.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use roster_core::{Action, ActionKind, AuditConfig, Change, ChangeSet, Entity, EntityKey, Outcomes};

use crate::codec::PathCodec;
use crate::error::{io_err, AuditError};
use crate::serializer::Serializer;

/// The two change-sets produced for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub sync: ChangeSet,
    pub valid: ChangeSet,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.sync.is_empty() && self.valid.is_empty()
    }
}

/// Reads the checkout and classifies entities. Never writes.
#[derive(Debug, Clone)]
pub struct Reconciler {
    root: PathBuf,
    codec: PathCodec,
    serializer: Serializer,
    sentinel: String,
}

impl Reconciler {
    pub fn new(
        root: impl Into<PathBuf>,
        codec: PathCodec,
        serializer: Serializer,
        sentinel: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            codec,
            serializer,
            sentinel: sentinel.into(),
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(
            &config.checkout_directory,
            PathCodec::new(config.escaping),
            Serializer::new(config.member_template.clone()),
            &config.sentinel,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    /// Compute the sync and valid change-sets for one run.
    pub fn reconcile<E: Entity>(
        &self,
        desired: &BTreeMap<EntityKey, E>,
        actions: &[Action<E>],
        succeeded: &Outcomes,
    ) -> Result<Reconciliation, AuditError> {
        let actions = self.membership_actions(desired, actions)?;
        let mut out = Reconciliation::default();

        for (key, entity) in desired {
            let filename = self.codec.encode(key)?;
            match actions.get(key) {
                None => self.handle_no_action(&mut out, &filename, entity)?,
                Some(&action) => self.handle_action(&mut out, action, succeeded, &filename, entity)?,
            }
        }

        for (&key, &action) in &actions {
            if desired.contains_key(key) {
                continue;
            }
            let filename = self.codec.encode(key)?;
            match action.kind {
                ActionKind::Delete => {
                    let existing = prior(action)?;
                    self.handle_delete(&mut out, succeeded.contains(key), &filename, existing)?;
                }
                ActionKind::Add | ActionKind::Update => {
                    tracing::warn!(
                        "Skip change ({} {filename}) with no desired state",
                        action.kind
                    );
                }
            }
        }

        self.find_drift(&mut out, desired, &actions)?;
        Ok(out)
    }

    /// Drop actions that cannot change a mirror file and index the rest by key.
    ///
    /// An update whose prior and desired serializations are identical (for
    /// example a change to an attribute the mirror does not record) is dropped.
    /// Later actions for the same key replace earlier ones.
    fn membership_actions<'a, E: Entity>(
        &self,
        desired: &BTreeMap<EntityKey, E>,
        actions: &'a [Action<E>],
    ) -> Result<BTreeMap<&'a EntityKey, &'a Action<E>>, AuditError> {
        let mut index = BTreeMap::new();
        for action in actions {
            if action.kind == ActionKind::Update {
                let existing = prior(action)?;
                if let Some(entity) = desired.get(&action.key) {
                    if self.serializer.contents(existing) == self.serializer.contents(entity) {
                        tracing::debug!("Ignoring update of {} with no mirrored change", action.key);
                        continue;
                    }
                }
            }
            index.insert(&action.key, action);
        }
        Ok(index)
    }

    fn handle_action<E: Entity>(
        &self,
        out: &mut Reconciliation,
        action: &Action<E>,
        succeeded: &Outcomes,
        filename: &str,
        entity: &E,
    ) -> Result<(), AuditError> {
        let ok = succeeded.contains(&action.key);
        match action.kind {
            ActionKind::Add => self.handle_add(out, ok, filename, entity),
            ActionKind::Update => self.handle_update(out, ok, filename, prior(action)?, entity),
            ActionKind::Delete => self.handle_delete(out, ok, filename, prior(action)?),
        }
    }

    fn handle_no_action<E: Entity>(
        &self,
        out: &mut Reconciliation,
        filename: &str,
        entity: &E,
    ) -> Result<(), AuditError> {
        let expected = self.serializer.contents(entity);
        match self.read_mirror(filename)? {
            Some(current) if current == expected.as_bytes() => {}
            Some(_) => {
                tracing::warn!("Sync change (update {filename}) required");
                out.sync.insert(filename.to_owned(), Change::Write(expected));
            }
            // Never written and nothing to record yet.
            None if entity.members().is_empty() => {}
            None => {
                tracing::warn!("Sync change (create {filename}) required");
                out.sync.insert(filename.to_owned(), Change::Write(expected));
            }
        }
        Ok(())
    }

    fn handle_add<E: Entity>(
        &self,
        out: &mut Reconciliation,
        ok: bool,
        filename: &str,
        entity: &E,
    ) -> Result<(), AuditError> {
        if self.read_mirror(filename)?.is_some() {
            if ok {
                // The file predates its own creation: remove it, then add it back.
                tracing::warn!("Sync change (delete {filename}) required");
                out.sync.insert(filename.to_owned(), Change::Delete);
            } else {
                tracing::warn!("Skip sync change (delete {filename}) due to unsuccessful action");
            }
        }

        if ok {
            tracing::debug!("Valid change (create {filename}) queued");
            out.valid
                .insert(filename.to_owned(), Change::Write(self.serializer.contents(entity)));
        } else {
            tracing::warn!("Skip change (add {filename}) due to unsuccessful action");
        }
        Ok(())
    }

    fn handle_update<E: Entity>(
        &self,
        out: &mut Reconciliation,
        ok: bool,
        filename: &str,
        existing: &E,
        entity: &E,
    ) -> Result<(), AuditError> {
        let expected = self.serializer.contents(entity);
        let previous = self.serializer.contents(existing);

        match (self.read_mirror(filename)?, ok) {
            (Some(current), true) => {
                if current != previous.as_bytes() {
                    tracing::warn!("Sync change (update {filename}) required");
                    out.sync.insert(filename.to_owned(), Change::Write(previous));
                }
                tracing::debug!("Valid change (update {filename}) queued");
                out.valid.insert(filename.to_owned(), Change::Write(expected));
            }
            (Some(current), false) if current == previous.as_bytes() => {
                tracing::warn!("Skip change (update {filename}) due to unsuccessful action");
            }
            (Some(_), false) => {
                tracing::warn!("Skip sync change (update {filename}) due to unsuccessful action");
            }
            (None, true) => {
                tracing::warn!("Sync change (create {filename}) required");
                out.sync.insert(filename.to_owned(), Change::Write(previous));
                tracing::debug!("Valid change (update {filename}) queued");
                out.valid.insert(filename.to_owned(), Change::Write(expected));
            }
            (None, false) => {
                tracing::warn!("Skip sync change (create {filename}) due to unsuccessful action");
            }
        }
        Ok(())
    }

    fn handle_delete<E: Entity>(
        &self,
        out: &mut Reconciliation,
        ok: bool,
        filename: &str,
        existing: &E,
    ) -> Result<(), AuditError> {
        let previous = self.serializer.contents(existing);

        match (self.read_mirror(filename)?, ok) {
            (Some(current), true) => {
                if current != previous.as_bytes() {
                    tracing::warn!("Sync change (update {filename}) required");
                    out.sync.insert(filename.to_owned(), Change::Write(previous));
                }
                tracing::debug!("Valid change (delete {filename}) queued");
                out.valid.insert(filename.to_owned(), Change::Delete);
            }
            (Some(current), false) if current == previous.as_bytes() => {
                tracing::warn!("Skip change (delete {filename}) due to unsuccessful action");
            }
            (Some(_), false) => {
                tracing::warn!("Skip sync change (update {filename}) due to unsuccessful action");
            }
            (None, true) => {
                tracing::warn!("Sync change (create {filename}) required");
                out.sync.insert(filename.to_owned(), Change::Write(previous));
                tracing::debug!("Valid change (delete {filename}) queued");
                out.valid.insert(filename.to_owned(), Change::Delete);
            }
            (None, false) => {
                tracing::warn!("Skip sync change (create {filename}) due to unsuccessful action");
            }
        }
        Ok(())
    }

    /// Files with no desired entity and no action: drift to be removed.
    fn find_drift<E: Entity>(
        &self,
        out: &mut Reconciliation,
        desired: &BTreeMap<EntityKey, E>,
        actions: &BTreeMap<&EntityKey, &Action<E>>,
    ) -> Result<(), AuditError> {
        for child in self.mirror_files()? {
            match self.codec.decode(&child) {
                Ok(key) if desired.contains_key(&key) || actions.contains_key(&key) => {}
                Ok(_) => {
                    tracing::warn!("Sync change (delete {child}) required");
                    out.sync.insert(child, Change::Delete);
                }
                Err(err) => {
                    tracing::warn!("Sync change (delete {child}) required: {err}");
                    out.sync.insert(child, Change::Delete);
                }
            }
        }
        Ok(())
    }

    /// Every regular file under the root, as `/`-joined relative paths.
    ///
    /// Skips the top-level sentinel and anything below a dot-prefixed
    /// segment (`.git`).
    pub fn mirror_files(&self) -> Result<Vec<String>, AuditError> {
        let mut files = Vec::new();
        let mut stack = vec![(self.root.clone(), String::new())];
        while let Some((dir, prefix)) = stack.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| io_err(&dir, e))?;
                let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                    tracing::warn!("Skipping non UTF-8 path under {}", dir.display());
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let rel = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                let path = entry.path();
                let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
                if file_type.is_dir() {
                    stack.push((path, rel));
                } else if path.is_file() && rel != self.sentinel {
                    files.push(rel);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Raw bytes of a mirror file, or `None` if there is no such file.
    ///
    /// Compared byte for byte against serializer output; never decoded.
    fn read_mirror(&self, filename: &str) -> Result<Option<Vec<u8>>, AuditError> {
        let path = self.root.join(filename);
        if !path.is_file() {
            return Ok(None);
        }
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(path, err)),
        }
    }
}

fn prior<E>(action: &Action<E>) -> Result<&E, AuditError> {
    action
        .existing
        .as_ref()
        .ok_or_else(|| AuditError::MissingExisting {
            key: action.key.clone(),
            kind: action.kind,
        })
}
