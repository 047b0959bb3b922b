//! Bounded FIFO history of evicted keys.
//!
//! The adaptive policy keeps one history per sub-policy. Each record carries
//! the tick at which the key was evicted, so a later miss on the same key can
//! be turned into a regret value. Records leave in insertion order when the
//! history overflows, and are removed outright when the key comes back.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, SlotId>        list: IntrusiveList<K> (stamp = eviction tick)
//!   ┌─────────┬─────────┐              front ─► [A|t3] ◄──► [B|t5] ◄──► [C|t8] ◄── back
//!   │  key A  │  id_1   │                oldest                          newest
//!   │  key B  │  id_2   │
//!   └─────────┴─────────┘
//! ```
//!
//! ## Behavior
//! - `record(k, tick)`: appends as newest; drops the oldest on overflow
//! - `remove(k)`: deletes and returns the eviction tick
//! - a zero-capacity history never holds anything
//!
//! All operations are O(1) average.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
use crate::error::{InvariantError, ensure_invariant};

/// Records reserved up front; larger histories grow on demand.
const PREALLOC_LIMIT: usize = 1 << 16;

/// Bounded FIFO of evicted keys stamped with their eviction tick.
#[derive(Debug, Clone)]
pub struct GhostHistory<K> {
    list: IntrusiveList<K>,
    index: FxHashMap<K, SlotId>,
    capacity: usize,
}

impl<K> GhostHistory<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a history holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        let prealloc = capacity.min(PREALLOC_LIMIT);
        Self {
            list: IntrusiveList::with_capacity(prealloc),
            index: FxHashMap::with_capacity_and_hasher(prealloc, Default::default()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Eviction tick recorded for `key`, if it is remembered.
    pub fn eviction_tick(&self, key: &K) -> Option<u64> {
        self.index.get(key).and_then(|&id| self.list.stamp(id))
    }

    /// Remembers `key` as evicted at `tick`.
    ///
    /// Returns the record that fell off the front, if any. A key that is
    /// already present is re-stamped and becomes the newest record.
    pub fn record(&mut self, key: K, tick: u64) -> Option<(K, u64)> {
        if self.capacity == 0 {
            return None;
        }
        if let Some(&id) = self.index.get(&key) {
            self.list.move_to_back(id, tick);
            return None;
        }

        let id = self.list.push_back(key.clone(), tick);
        self.index.insert(key, id);

        if self.list.len() > self.capacity {
            let (dropped, stamp) = self.list.pop_front()?;
            self.index.remove(&dropped);
            return Some((dropped, stamp));
        }
        None
    }

    /// Forgets `key`, returning the tick it was evicted at.
    pub fn remove(&mut self, key: &K) -> Option<u64> {
        let id = self.index.remove(key)?;
        self.list.remove(id).map(|(_, tick)| tick)
    }

    /// Iterates `(key, eviction_tick)` from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.list.iter().map(|(_, key, tick)| (key, tick))
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.list.check_invariants()?;
        ensure_invariant!(
            self.list.len() == self.index.len(),
            "ghost list holds {} records but index holds {}",
            self.list.len(),
            self.index.len()
        );
        ensure_invariant!(
            self.list.len() <= self.capacity,
            "ghost history holds {} records over capacity {}",
            self.list.len(),
            self.capacity
        );
        for (id, key, _) in self.list.iter() {
            ensure_invariant!(
                self.index.get(key) == Some(&id),
                "ghost index points away from its list node"
            );
        }
        Ok(())
    }
}
