//! Content addressed result storage with stable slots.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::{
    change::{ChangeMsg, Record},
    hash::{ContentHash, content_hash},
    prelude::*,
};

/// Live result set keyed by record content.
///
/// Every record added gets the next slot. Updates overwrite their slot in
/// place and deletes leave a tombstone, so the position of every other record
/// never changes while the container lives.
#[derive(Debug, Clone, Default)]
pub struct ResultContainer {
    results: Vec<Option<Record>>,
    keys: HashMap<ContentHash, usize>,
}

impl ResultContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its slot.
    ///
    /// Adding content that is already live is rejected and leaves the
    /// container untouched.
    pub fn add(&mut self, record: Record) -> Result<usize> {
        let hash = content_hash(&record);
        if self.keys.contains_key(&hash) {
            return Err(Error::DuplicateRecord(hash));
        }
        let slot = self.results.len();
        self.results.push(Some(record));
        self.keys.insert(hash, slot);
        trace!("Added result {hash} at slot {slot}");
        Ok(slot)
    }

    /// Replace the content of the slot holding `before` with `after`.
    pub fn update(&mut self, before: &Record, after: Record) -> Result<usize> {
        let old = content_hash(before);
        let new = content_hash(&after);
        let slot = *self.keys.get(&old).ok_or(Error::UnknownRecord(old))?;

        if let Some(&other) = self.keys.get(&new) {
            if other != slot {
                return Err(Error::DuplicateRecord(new));
            }
        }

        self.keys.remove(&old);
        self.keys.insert(new, slot);
        self.results[slot] = Some(after);
        trace!("Updated result {old} -> {new} at slot {slot}");
        Ok(slot)
    }

    /// Tombstone the slot holding `record` and return it.
    pub fn delete(&mut self, record: &Record) -> Result<usize> {
        let hash = content_hash(record);
        let slot = self.keys.remove(&hash).ok_or(Error::UnknownRecord(hash))?;
        self.results[slot] = None;
        trace!("Deleted result {hash} at slot {slot}");
        Ok(slot)
    }

    /// Raw backing slots, tombstones included.
    pub fn iter(&self) -> &[Option<Record>] {
        &self.results
    }

    /// Live records in slot order.
    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.results.iter().flatten()
    }

    /// Slot currently holding `record`, if it is live.
    pub fn slot_of(&self, record: &Record) -> Option<usize> {
        self.keys.get(&content_hash(record)).copied()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Apply one change batch: additions, then updates, then deletions.
    ///
    /// Items that cannot be applied are skipped; their errors are returned
    /// in the order they happened.
    pub fn apply(&mut self, change: ChangeMsg) -> Vec<Error> {
        let mut errors = Vec::new();

        for record in change.added_results {
            if let Err(err) = self.add(record) {
                warn!("Skipping added result - {err}");
                errors.push(err);
            }
        }
        for updated in change.updated_results {
            if let Err(err) = self.update(&updated.before, updated.after) {
                warn!("Skipping updated result - {err}");
                errors.push(err);
            }
        }
        for record in change.deleted_results {
            if let Err(err) = self.delete(&record) {
                warn!("Skipping deleted result - {err}");
                errors.push(err);
            }
        }

        errors
    }
}
