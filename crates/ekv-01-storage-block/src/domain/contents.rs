//! # Block Contents
//!
//! In-memory key-value data held by a block, with exact size accounting.
//!
//! Every entry remembers the slot its key hashes to, so a slot range can be
//! extracted for export or dropped after the ownership flip without
//! re-hashing keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{Key, Slot, SlotRange, Value, WriteOp};

/// A stored value and the slot of its key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValue {
    /// Slot of the key.
    pub slot: Slot,
    /// Value bytes.
    pub value: Value,
}

/// An entry shipped from an exporting block to an importing one.
///
/// `value: None` is a tombstone: the key was removed while the transfer was
/// in flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratedEntry {
    /// Slot of the key.
    pub slot: Slot,
    /// Key bytes.
    pub key: Key,
    /// Value bytes, or `None` for a removal.
    pub value: Option<Value>,
}

impl MigratedEntry {
    /// Entry mirroring a write operation.
    pub fn from_op(slot: Slot, op: &WriteOp) -> Self {
        match op {
            WriteOp::Put { key, value } => Self {
                slot,
                key: key.clone(),
                value: Some(value.clone()),
            },
            WriteOp::Remove { key } => Self {
                slot,
                key: key.clone(),
                value: None,
            },
        }
    }
}

/// Key-value contents of one block.
///
/// `size_bytes` is the sum of key and value lengths of live entries and is
/// kept exact on every mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockContents {
    entries: BTreeMap<Key, StoredValue>,
    size_bytes: usize,
}

impl BlockContents {
    /// Create empty contents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build contents from `(slot, key, value)` triples.
    pub fn from_entries(entries: impl IntoIterator<Item = (Slot, Key, Value)>) -> Self {
        let mut contents = Self::new();
        for (slot, key, value) in entries {
            contents.put(slot, key, value);
        }
        contents
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no key is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact live usage in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Look up a key stored under `slot`.
    pub fn get(&self, slot: Slot, key: &[u8]) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|stored| stored.slot == slot)
            .map(|stored| &stored.value)
    }

    /// Iterate `(slot, key, value)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &Key, &Value)> {
        self.entries
            .iter()
            .map(|(key, stored)| (stored.slot, key, &stored.value))
    }

    /// Apply a write operation.
    pub fn apply(&mut self, slot: Slot, op: &WriteOp) {
        match op {
            WriteOp::Put { key, value } => self.put(slot, key.clone(), value.clone()),
            WriteOp::Remove { key } => self.remove(key),
        }
    }

    /// Apply an entry received from an exporting block.
    pub fn apply_migrated(&mut self, entry: MigratedEntry) {
        match entry.value {
            Some(value) => self.put(entry.slot, entry.key, value),
            None => self.remove(&entry.key),
        }
    }

    /// Copy every entry whose slot falls in `range`.
    pub fn extract_range(&self, range: &SlotRange) -> Vec<MigratedEntry> {
        self.entries
            .iter()
            .filter(|(_, stored)| range.contains(stored.slot))
            .map(|(key, stored)| MigratedEntry {
                slot: stored.slot,
                key: key.clone(),
                value: Some(stored.value.clone()),
            })
            .collect()
    }

    /// Drop every entry whose slot falls in `range`. Returns the number dropped.
    pub fn remove_range(&mut self, range: &SlotRange) -> usize {
        let before = self.entries.len();
        let mut freed = 0usize;
        self.entries.retain(|key, stored| {
            if range.contains(stored.slot) {
                freed += key.len() + stored.value.len();
                false
            } else {
                true
            }
        });
        self.size_bytes -= freed;
        before - self.entries.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.size_bytes = 0;
    }

    fn put(&mut self, slot: Slot, key: Key, value: Value) {
        let added = key.len() + value.len();
        if let Some(old) = self.entries.get(&key) {
            self.size_bytes -= key.len() + old.value.len();
        }
        self.entries.insert(key, StoredValue { slot, value });
        self.size_bytes += added;
    }

    fn remove(&mut self, key: &[u8]) {
        if let Some(old) = self.entries.remove(key) {
            self.size_bytes -= key.len() + old.value.len();
        }
    }
}
