//! Runtime parameter storage.
//!
//! Parameters keep their decode-time file order (node slices are windows
//! into that order) and are additionally indexed by name hash for global
//! lookups, where a later record overwrites an earlier one — intentional
//! for shared names like `gate`.
//!
//! `current_value` is an atomic f32 (bit-cast through `AtomicU32`) so a
//! control thread can write while the audio thread reads, with no locking
//! in steady state. The surrounding [`ParamTable`] takes its write lock
//! only while `load()` swaps the whole structure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use crate::chunk::{Node, Parameter};

/// One parameter slot: the immutable record plus the mutable value.
pub(crate) struct ParamSlot {
    pub record: Parameter,
    value: AtomicU32,
}

impl ParamSlot {
    fn new(record: Parameter) -> Self {
        Self {
            value: AtomicU32::new(record.default_value.to_bits()),
            record,
        }
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Relaxed))
    }

    fn set_clamped(&self, value: f32) {
        let clamped = value.clamp(self.record.min_value, self.record.max_value);
        self.value.store(clamped.to_bits(), Ordering::Relaxed);
    }

    fn set_raw(&self, value: f32) {
        self.value.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// All parameters of one loaded chunk.
#[derive(Default)]
pub(crate) struct ParamStore {
    slots: Vec<ParamSlot>,
    by_hash: HashMap<u64, usize>,
}

impl ParamStore {
    pub fn from_records(records: &[Parameter]) -> Self {
        let mut slots = Vec::with_capacity(records.len());
        let mut by_hash = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            slots.push(ParamSlot::new(*record));
            by_hash.insert(record.name_hash, index); // last write wins
        }
        Self { slots, by_hash }
    }

    /// Writes a value through the global hash map, clamped into the
    /// parameter's range. Unknown hashes are ignored.
    pub fn set(&self, hash: u64, value: f32) {
        if let Some(&index) = self.by_hash.get(&hash) {
            self.slots[index].set_clamped(value);
        } else {
            tracing::trace!(hash, value, "ignoring write to unknown parameter");
        }
    }

    /// Overwrites a value without clamping (the engine's `time` feed).
    pub fn set_raw(&self, hash: u64, value: f32) {
        if let Some(&index) = self.by_hash.get(&hash) {
            self.slots[index].set_raw(value);
        }
    }

    /// Current value by global hash lookup.
    pub fn global(&self, hash: u64) -> Option<f32> {
        self.by_hash.get(&hash).map(|&index| self.slots[index].get())
    }

    /// Current value for a node: scans the node's private slice first,
    /// then falls back to the global map.
    pub fn node_value(&self, node: &Node, hash: u64) -> Option<f32> {
        let offset = node.param_offset as usize;
        let count = node.param_count as usize;
        if let Some(window) = self.slots.get(offset..) {
            for slot in window.iter().take(count) {
                if slot.record.name_hash == hash {
                    return Some(slot.get());
                }
            }
        }
        self.global(hash)
    }

    /// The record hash and current value at a slice position, for the
    /// Parameter node (which emits its slice head).
    pub fn slot_at(&self, index: usize) -> Option<(u64, f32)> {
        self.slots
            .get(index)
            .map(|slot| (slot.record.name_hash, slot.get()))
    }
}

/// Structure lock around the store: readers are the audio thread and
/// `set_parameter` callers; the single writer is `load()`.
#[derive(Default)]
pub(crate) struct ParamTable {
    store: RwLock<ParamStore>,
}

impl ParamTable {
    pub fn read(&self) -> RwLockReadGuard<'_, ParamStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace(&self, store: ParamStore) {
        *self
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner) = store;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::fnv1a_hash;

    fn record(name: &str, default: f32, min: f32, max: f32) -> Parameter {
        Parameter {
            name_hash: fnv1a_hash(name),
            default_value: default,
            min_value: min,
            max_value: max,
        }
    }

    #[test]
    fn writes_clamp_into_range() {
        let store = ParamStore::from_records(&[record("cutoff", 1000.0, 20.0, 20_000.0)]);
        let hash = fnv1a_hash("cutoff");

        store.set(hash, 50_000.0);
        assert_eq!(store.global(hash), Some(20_000.0));

        store.set(hash, -3.0);
        assert_eq!(store.global(hash), Some(20.0));
    }

    #[test]
    fn unknown_hash_is_ignored() {
        let store = ParamStore::from_records(&[record("a", 1.0, 0.0, 2.0)]);
        store.set(fnv1a_hash("missing"), 5.0);
        assert_eq!(store.global(fnv1a_hash("a")), Some(1.0));
    }

    #[test]
    fn global_lookup_is_last_write_wins() {
        let store = ParamStore::from_records(&[
            record("gate", 0.0, 0.0, 1.0),
            record("gate", 0.5, 0.0, 1.0),
        ]);
        assert_eq!(store.global(fnv1a_hash("gate")), Some(0.5));
    }

    #[test]
    fn node_lookup_prefers_the_private_slice() {
        let store = ParamStore::from_records(&[
            record("pitch", 2.0, 0.0, 4.0),
            record("pitch", 1.0, 0.0, 4.0),
        ]);
        // Global map points at index 1; the node's slice covers only index 0.
        let node = Node {
            id: 7,
            node_type: 7,
            input_count: 2,
            output_count: 1,
            param_offset: 0,
            param_count: 1,
        };
        assert_eq!(store.node_value(&node, fnv1a_hash("pitch")), Some(2.0));
    }

    #[test]
    fn node_lookup_falls_back_to_global() {
        let store = ParamStore::from_records(&[record("gate", 0.0, 0.0, 1.0)]);
        let node = Node {
            id: 3,
            node_type: 4,
            input_count: 1,
            output_count: 1,
            param_offset: 0,
            param_count: 0,
        };
        assert_eq!(store.node_value(&node, fnv1a_hash("gate")), Some(0.0));
        assert_eq!(store.node_value(&node, fnv1a_hash("nope")), None);
    }

    #[test]
    fn raw_writes_skip_clamping() {
        let store = ParamStore::from_records(&[record("time", 0.0, 0.0, 1.0)]);
        store.set_raw(fnv1a_hash("time"), 12.5);
        assert_eq!(store.global(fnv1a_hash("time")), Some(12.5));
    }
}
