//! Frequency ring for O(1) LFU and MFU selection.
//!
//! Entries with the same access count share a bucket; buckets form a circular
//! doubly linked list ordered by count, anchored by a sentinel bucket with
//! `count == 0` stored at slot 0 of the bucket arena. The sentinel's `next` is
//! the least-frequent bucket and its `prev` the most-frequent one, so both
//! extremes are one hop away.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                         FrequencyRing<T> Layout                          │
//! │                                                                          │
//! │   buckets: SlotArena<Bucket>  (slot 0 = sentinel, count 0)               │
//! │                                                                          │
//! │      ┌──────────────────────────────────────────────────────────────┐    │
//! │      ▼                                                              │    │
//! │   ┌──────┐ next  ┌──────┐ next  ┌──────┐ next  ┌──────┐ next        │    │
//! │   │ c=0  │──────►│ c=1  │──────►│ c=2  │──────►│ c=7  │─────────────┘    │
//! │   │ sent │◄──────│      │◄──────│      │◄──────│      │                  │
//! │   └──────┘ prev  └──┬───┘ prev  └──┬───┘ prev  └──┬───┘                  │
//! │                     │              │              │                      │
//! │                     ▼              ▼              ▼                      │
//! │   nodes:        [e4]◄─►[e9]      [e1]          [e2]◄─►[e5]               │
//! │   (SlotArena)   head    tail     head          head    tail              │
//! │                 oldest  newest                                           │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Promotion
//!
//! `touch(e)` moves `e` from bucket `c` to bucket `c + 1`. If `bucket.next`
//! already carries `c + 1` the entry joins it; otherwise a new bucket is
//! spliced in right after `c`. The old bucket is dropped the moment it
//! empties. `touch_by(e, n)` walks forward at most `n` buckets looking for
//! `c + n`, splicing a new bucket before the first larger count, so a count is
//! never represented twice.
//!
//! Within a bucket, arrivals are appended at the tail and victims are taken
//! from the head, giving FIFO order among equal counts.
//!
//! ## Operations
//!
//! | Operation                  | Time | Notes                              |
//! |----------------------------|------|------------------------------------|
//! | `insert`                   | O(1) | Joins (or creates) bucket 1        |
//! | `touch`                    | O(1) | +1 and relocate                    |
//! | `touch_by`                 | O(n) | Bounded by the increment           |
//! | `remove`                   | O(1) | Unlink; drops an emptied bucket    |
//! | `least_frequent`           | O(1) | Head of the lowest bucket          |
//! | `most_frequent`            | O(1) | Head of the highest bucket         |
//! | `*_excluding`              | O(1) | Skips one entry (the candidate)    |
//!
//! Handles passed to `touch`, `touch_by` and `remove` must be linked; a stale
//! handle panics.
//!
//! ## Example
//!
//! ```
//! use cachesim::ds::FrequencyRing;
//!
//! let mut ring = FrequencyRing::new();
//! let a = ring.insert("a");
//! let b = ring.insert("b");
//! ring.touch(a);
//!
//! assert_eq!(ring.least_frequent(), Some(b));
//! assert_eq!(ring.most_frequent(), Some(a));
//! assert_eq!(ring.count(a), Some(2));
//! ring.check_invariants().unwrap();
//! ```

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::{InvariantError, ensure_invariant};

const SENTINEL: SlotId = SlotId(0);

#[derive(Debug, Clone)]
struct Bucket {
    count: u64,
    prev: SlotId,
    next: SlotId,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl Bucket {
    fn sentinel() -> Self {
        Self {
            count: 0,
            prev: SENTINEL,
            next: SENTINEL,
            head: None,
            tail: None,
            len: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    bucket: SlotId,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Circular ring of frequency buckets with FIFO order inside each bucket.
#[derive(Debug, Clone)]
pub struct FrequencyRing<T> {
    buckets: SlotArena<Bucket>,
    nodes: SlotArena<Node<T>>,
}

impl<T> FrequencyRing<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut buckets = SlotArena::with_capacity(16);
        let sentinel = buckets.insert(Bucket::sentinel());
        debug_assert_eq!(sentinel, SENTINEL);
        Self {
            buckets,
            nodes: SlotArena::with_capacity(capacity),
        }
    }

    /// Number of linked entries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of non-sentinel buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len() - 1
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.nodes.contains(id)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.nodes.get(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.nodes.get_mut(id).map(|node| &mut node.value)
    }

    /// Access count of the entry at `id`.
    pub fn count(&self, id: SlotId) -> Option<u64> {
        self.nodes.get(id).map(|node| self.buckets[node.bucket].count)
    }

    /// Links `value` into the `count == 1` bucket as its newest entry.
    pub fn insert(&mut self, value: T) -> SlotId {
        let first = self.buckets[SENTINEL].next;
        let target = if first != SENTINEL && self.buckets[first].count == 1 {
            first
        } else {
            self.splice_after(SENTINEL, 1)
        };
        let id = self.nodes.insert(Node {
            value,
            bucket: target,
            prev: None,
            next: None,
        });
        self.append(target, id);
        id
    }

    /// Increments the entry's count by one. Returns the new count.
    #[inline]
    pub fn touch(&mut self, id: SlotId) -> u64 {
        self.touch_by(id, 1)
    }

    /// Increments the entry's count by `amount`. Returns the new count.
    ///
    /// Walks forward from the current bucket until it meets `count + amount`
    /// or passes it; at most `amount` buckets are visited because counts are
    /// strictly increasing.
    pub fn touch_by(&mut self, id: SlotId, amount: u64) -> u64 {
        let current = self.nodes[id].bucket;
        let count = self.buckets[current].count;
        let wanted = count.saturating_add(amount);
        if wanted == count {
            return count;
        }

        let mut cursor = current;
        let target = loop {
            let next = self.buckets[cursor].next;
            if next == SENTINEL || self.buckets[next].count > wanted {
                break self.splice_after(cursor, wanted);
            }
            if self.buckets[next].count == wanted {
                break next;
            }
            cursor = next;
        };

        self.unlink(id);
        self.nodes[id].bucket = target;
        self.append(target, id);
        wanted
    }

    /// Unlinks the entry and returns its value.
    pub fn remove(&mut self, id: SlotId) -> T {
        self.unlink(id);
        match self.nodes.remove(id) {
            Some(node) => node.value,
            None => panic!("frequency ring entry {} is not linked", id.index()),
        }
    }

    /// Oldest entry of the lowest-count bucket.
    pub fn least_frequent(&self) -> Option<SlotId> {
        self.buckets[self.buckets[SENTINEL].next].head
    }

    /// Oldest entry of the highest-count bucket.
    pub fn most_frequent(&self) -> Option<SlotId> {
        self.buckets[self.buckets[SENTINEL].prev].head
    }

    /// Least-frequent entry other than `excluded`.
    pub fn least_frequent_excluding(&self, excluded: SlotId) -> Option<SlotId> {
        let first = self.buckets[SENTINEL].next;
        self.first_excluding(first, excluded, |bucket| bucket.next)
    }

    /// Most-frequent entry other than `excluded`.
    pub fn most_frequent_excluding(&self, excluded: SlotId) -> Option<SlotId> {
        let last = self.buckets[SENTINEL].prev;
        self.first_excluding(last, excluded, |bucket| bucket.prev)
    }

    fn first_excluding(
        &self,
        start: SlotId,
        excluded: SlotId,
        step: impl Fn(&Bucket) -> SlotId,
    ) -> Option<SlotId> {
        let mut bucket = start;
        while bucket != SENTINEL {
            let mut cursor = self.buckets[bucket].head;
            while let Some(id) = cursor {
                if id != excluded {
                    return Some(id);
                }
                cursor = self.nodes[id].next;
            }
            bucket = step(&self.buckets[bucket]);
        }
        None
    }

    /// Iterates `(id, count, value)` in ascending count, FIFO within a count.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, u64, &T)> {
        let mut bucket = self.buckets[SENTINEL].next;
        let mut cursor = self.buckets[bucket].head;
        std::iter::from_fn(move || {
            loop {
                if let Some(id) = cursor {
                    let node = &self.nodes[id];
                    cursor = node.next;
                    return Some((id, self.buckets[bucket].count, &node.value));
                }
                if bucket == SENTINEL {
                    return None;
                }
                bucket = self.buckets[bucket].next;
                cursor = self.buckets[bucket].head;
            }
        })
    }

    /// Bucket counts in ring order, sentinel excluded.
    pub fn bucket_counts(&self) -> Vec<u64> {
        let mut counts = Vec::with_capacity(self.bucket_count());
        let mut bucket = self.buckets[SENTINEL].next;
        while bucket != SENTINEL {
            counts.push(self.buckets[bucket].count);
            bucket = self.buckets[bucket].next;
        }
        counts
    }

    fn splice_after(&mut self, prev: SlotId, count: u64) -> SlotId {
        let next = self.buckets[prev].next;
        let id = self.buckets.insert(Bucket {
            count,
            prev,
            next,
            head: None,
            tail: None,
            len: 0,
        });
        self.buckets[prev].next = id;
        self.buckets[next].prev = id;
        id
    }

    fn drop_bucket(&mut self, id: SlotId) {
        let (prev, next) = {
            let bucket = &self.buckets[id];
            (bucket.prev, bucket.next)
        };
        self.buckets[prev].next = next;
        self.buckets[next].prev = prev;
        self.buckets.remove(id);
    }

    fn append(&mut self, bucket: SlotId, id: SlotId) {
        let old_tail = self.buckets[bucket].tail;
        {
            let node = &mut self.nodes[id];
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.nodes[tail].next = Some(id),
            None => self.buckets[bucket].head = Some(id),
        }
        let b = &mut self.buckets[bucket];
        b.tail = Some(id);
        b.len += 1;
    }

    /// Detaches the node from its bucket, dropping the bucket if it empties.
    fn unlink(&mut self, id: SlotId) {
        let (bucket, prev, next) = match self.nodes.get(id) {
            Some(node) => (node.bucket, node.prev, node.next),
            None => panic!("frequency ring entry {} is not linked", id.index()),
        };
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.buckets[bucket].head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.buckets[bucket].tail = prev,
        }
        let node = &mut self.nodes[id];
        node.prev = None;
        node.next = None;

        self.buckets[bucket].len -= 1;
        if self.buckets[bucket].len == 0 {
            self.drop_bucket(bucket);
        }
    }

    /// Verifies ordering, emptiness and size bookkeeping of the ring.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let sentinel = &self.buckets[SENTINEL];
        ensure_invariant!(sentinel.count == 0, "sentinel count is {}", sentinel.count);
        ensure_invariant!(sentinel.len == 0, "sentinel owns entries");

        let mut linked = 0usize;
        let mut visited = 0usize;
        let mut prev = SENTINEL;
        let mut bucket = sentinel.next;
        while bucket != SENTINEL {
            let b = self
                .buckets
                .get(bucket)
                .ok_or_else(|| InvariantError::new(format!("ring links vacant bucket {}", bucket.index())))?;
            ensure_invariant!(b.prev == prev, "bucket {} has a broken back link", b.count);
            ensure_invariant!(
                b.count > self.buckets[prev].count,
                "bucket counts not strictly increasing: {} after {}",
                b.count,
                self.buckets[prev].count
            );
            ensure_invariant!(b.len > 0, "bucket {} is empty", b.count);

            let mut in_bucket = 0usize;
            let mut node_prev = None;
            let mut cursor = b.head;
            while let Some(id) = cursor {
                let node = self
                    .nodes
                    .get(id)
                    .ok_or_else(|| InvariantError::new(format!("bucket {} links vacant node", b.count)))?;
                ensure_invariant!(node.bucket == bucket, "node filed under the wrong bucket");
                ensure_invariant!(node.prev == node_prev, "node has a broken back link");
                in_bucket += 1;
                ensure_invariant!(in_bucket <= self.nodes.len(), "bucket {} cycles", b.count);
                node_prev = Some(id);
                cursor = node.next;
            }
            ensure_invariant!(node_prev == b.tail, "bucket {} tail mismatch", b.count);
            ensure_invariant!(
                in_bucket == b.len,
                "bucket {} records {} entries but links {}",
                b.count,
                b.len,
                in_bucket
            );

            linked += in_bucket;
            visited += 1;
            ensure_invariant!(visited < self.buckets.len(), "bucket ring cycles");
            prev = bucket;
            bucket = b.next;
        }
        ensure_invariant!(sentinel.prev == prev, "sentinel prev is not the last bucket");
        ensure_invariant!(
            visited == self.bucket_count(),
            "ring links {} buckets but arena holds {}",
            visited,
            self.bucket_count()
        );
        ensure_invariant!(
            linked == self.nodes.len(),
            "buckets link {} entries but ring tracks {}",
            linked,
            self.nodes.len()
        );
        Ok(())
    }
}

impl<T> Default for FrequencyRing<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<SlotId> for FrequencyRing<T> {
    type Output = T;

    fn index(&self, id: SlotId) -> &T {
        &self.nodes[id].value
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // =============================================================================
    // Property Tests - Ring Invariants
    // =============================================================================

    proptest! {
        /// Property: bucket sizes add up to the ring length and counts strictly increase
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_ring_invariants_hold(
            ops in prop::collection::vec((0u8..4, any::<u16>(), 1u64..6), 0..200)
        ) {
            let mut ring = FrequencyRing::new();
            let mut live: Vec<SlotId> = Vec::new();

            for (op, pick, amount) in ops {
                match op {
                    0 => live.push(ring.insert(pick as u64)),
                    1 if !live.is_empty() => {
                        let id = live[pick as usize % live.len()];
                        ring.touch(id);
                    }
                    2 if !live.is_empty() => {
                        let id = live[pick as usize % live.len()];
                        ring.touch_by(id, amount);
                    }
                    3 if !live.is_empty() => {
                        let id = live.swap_remove(pick as usize % live.len());
                        ring.remove(id);
                    }
                    _ => {}
                }

                prop_assert!(ring.check_invariants().is_ok());
                prop_assert_eq!(ring.len(), live.len());
                let counts = ring.bucket_counts();
                prop_assert!(counts.windows(2).all(|w| w[0] < w[1]));
            }
        }

        /// Property: counts track the number of increments applied
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_count_matches_increments(
            bumps in prop::collection::vec((0usize..8, 1u64..4), 0..100)
        ) {
            let mut ring = FrequencyRing::new();
            let ids: Vec<SlotId> = (0..8u64).map(|k| ring.insert(k)).collect();
            let mut expected = [1u64; 8];

            for (slot, amount) in bumps {
                ring.touch_by(ids[slot], amount);
                expected[slot] += amount;
            }

            for (slot, id) in ids.iter().enumerate() {
                prop_assert_eq!(ring.count(*id), Some(expected[slot]));
            }
            let min = *expected.iter().min().unwrap();
            let least = ring.least_frequent().unwrap();
            prop_assert_eq!(ring.count(least), Some(min));
        }
    }
}
