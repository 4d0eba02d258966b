//! Pending-changes tracking for editable profile lists.
//!
//! A `PendingChanges<T>` holds an original snapshot of persisted records and
//! the edits made on top of it (additions, updates, deletions). The edits are
//! reconciled so that the resulting [`BatchUpdate`] is minimal: an addition
//! that is later removed never reaches the database, and an update that
//! restores the original value is dropped.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PendingError {
    #[error("unknown record key {0}")]
    UnknownKey(Uuid),
    #[error("record key {0} appears more than once")]
    DuplicateKey(Uuid),
}

/// An item paired with the id of the persisted record it replaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identified<T> {
    pub id: Uuid,
    #[serde(flatten)]
    pub data: T,
}

/// Wire shape of a batch: records to insert, records to overwrite, ids to soft-delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchUpdate<T> {
    // A bare `#[serde(default)]` here would demand `T: Default`.
    #[serde(default = "Vec::new")]
    pub new: Vec<T>,
    #[serde(default = "Vec::new")]
    pub updated: Vec<Identified<T>>,
    #[serde(default)]
    pub deleted: Vec<Uuid>,
}

impl<T> Default for BatchUpdate<T> {
    fn default() -> Self {
        Self {
            new: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T> BatchUpdate<T> {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.updated.len() + self.deleted.len()
    }
}

/// A desired list entry: `id` is set for records that already exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncItem<T> {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Debug, Clone)]
pub struct PendingChanges<T> {
    original: Vec<(Uuid, T)>,
    added: Vec<(Uuid, T)>,
    updated: Vec<(Uuid, T)>,
    deleted: Vec<Uuid>,
}

impl<T: Clone + PartialEq> PendingChanges<T> {
    pub fn new(original: Vec<(Uuid, T)>) -> Self {
        Self {
            original,
            added: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }

    /// Stages a new record and returns its temporary key.
    pub fn add(&mut self, item: T) -> Uuid {
        let key = Uuid::new_v4();
        self.added.push((key, item));
        key
    }

    pub fn update(&mut self, key: Uuid, item: T) -> Result<(), PendingError> {
        if let Some(slot) = self.added.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = item;
            return Ok(());
        }

        let original = self.live_original(key)?;
        let unchanged = *original == item;
        self.updated.retain(|(k, _)| *k != key);
        if !unchanged {
            self.updated.push((key, item));
        }
        Ok(())
    }

    pub fn remove(&mut self, key: Uuid) -> Result<(), PendingError> {
        if let Some(pos) = self.added.iter().position(|(k, _)| *k == key) {
            self.added.remove(pos);
            return Ok(());
        }

        self.live_original(key)?;
        self.updated.retain(|(k, _)| *k != key);
        self.deleted.push(key);
        Ok(())
    }

    /// The list as it would look after saving: surviving originals in their
    /// original order (with updates applied), then additions.
    pub fn current(&self) -> Vec<(Uuid, &T)> {
        let originals = self
            .original
            .iter()
            .filter(|(id, _)| !self.deleted.contains(id))
            .map(|(id, item)| {
                let item = self
                    .updated
                    .iter()
                    .find(|(k, _)| k == id)
                    .map(|(_, updated)| updated)
                    .unwrap_or(item);
                (*id, item)
            });
        let added = self.added.iter().map(|(key, item)| (*key, item));
        originals.chain(added).collect()
    }

    pub fn is_dirty(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }

    /// Discards every staged edit.
    pub fn reset(&mut self) {
        self.added.clear();
        self.updated.clear();
        self.deleted.clear();
    }

    pub fn into_batch(self) -> BatchUpdate<T> {
        BatchUpdate {
            new: self.added.into_iter().map(|(_, item)| item).collect(),
            updated: self
                .updated
                .into_iter()
                .map(|(id, data)| Identified { id, data })
                .collect(),
            deleted: self.deleted,
        }
    }

    /// Computes the batch that turns `original` into `desired`.
    ///
    /// Originals missing from `desired` are deleted, entries with an id are
    /// updates (dropped when unchanged) and entries without one are additions.
    /// An id may appear at most once.
    pub fn diff(
        original: Vec<(Uuid, T)>,
        desired: Vec<SyncItem<T>>,
    ) -> Result<BatchUpdate<T>, PendingError> {
        let mut pending = Self::new(original);
        let mut kept = HashSet::with_capacity(desired.len());

        for SyncItem { id, data } in desired {
            match id {
                Some(id) => {
                    if !kept.insert(id) {
                        return Err(PendingError::DuplicateKey(id));
                    }
                    pending.update(id, data)?;
                }
                None => {
                    pending.add(data);
                }
            }
        }

        let dropped: Vec<Uuid> = pending
            .original
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !kept.contains(id))
            .collect();
        for id in dropped {
            pending.remove(id)?;
        }

        Ok(pending.into_batch())
    }

    fn live_original(&self, key: Uuid) -> Result<&T, PendingError> {
        if self.deleted.contains(&key) {
            return Err(PendingError::UnknownKey(key));
        }
        self.original
            .iter()
            .find(|(id, _)| *id == key)
            .map(|(_, item)| item)
            .ok_or(PendingError::UnknownKey(key))
    }
}
