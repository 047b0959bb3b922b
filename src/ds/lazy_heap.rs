//! Lazy min-heap with stale entry skipping.
//!
//! Scores live in an authoritative map; the binary heap only holds
//! `(score, seq, key)` snapshots. Updating a score pushes a fresh snapshot
//! and leaves the old one behind, and every read first drops stale
//! snapshots from the top. A snapshot is live iff the map still holds its
//! exact `(score, seq)` pair, so stale entries never resurface.
//!
//! ```text
//!   scores: { 7 → (3, seq 5), 9 → (4, seq 2) }
//!
//!   heap (min first):  (3, 1, k7)  ← stale, map says seq 5
//!                      (3, 5, k7)  ← best
//!                      (4, 2, k9)
//! ```
//!
//! Equal scores pop in `seq` order: the key updated longest ago goes first.
//! [`adjust_all`](LazyMinHeap::adjust_all) rewrites every score in place and
//! rebuilds the heap, keeping each key's `seq` so tie order survives.
//!
//! | Operation             | Complexity           |
//! |-----------------------|----------------------|
//! | `update`              | O(log n)             |
//! | `remove`              | O(1)                 |
//! | `peek_best`           | amortized O(log n)   |
//! | `peek_best_excluding` | amortized O(log n)   |
//! | `adjust_all`          | O(n)                 |
//!
//! ## Example
//!
//! ```
//! use cachesim::ds::LazyMinHeap;
//!
//! let mut heap: LazyMinHeap<u64, i64> = LazyMinHeap::new();
//! heap.update(1, 5);
//! heap.update(2, 2);
//! heap.update(1, 1);
//!
//! assert_eq!(heap.peek_best(), Some((1, 1)));
//! assert_eq!(heap.peek_best_excluding(1), Some((2, 2)));
//! assert_eq!(heap.heap_len(), 3);
//! assert_eq!(heap.len(), 2);
//! ```

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::{InvariantError, ensure_invariant};

const REBUILD_SLACK: usize = 64;

#[derive(Debug, Clone, Copy)]
struct HeapEntry<K, S> {
    score: S,
    seq: u64,
    key: K,
}

impl<K, S: Ord> PartialEq for HeapEntry<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl<K, S: Ord> Eq for HeapEntry<K, S> {}

impl<K, S: Ord> PartialOrd for HeapEntry<K, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, S: Ord> Ord for HeapEntry<K, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.score.cmp(&other.score) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ordering => ordering,
        }
    }
}

/// Min-heap with O(log n) score updates via lazy deletion.
#[derive(Debug, Clone)]
pub struct LazyMinHeap<K, S> {
    scores: FxHashMap<K, (S, u64)>,
    heap: BinaryHeap<Reverse<HeapEntry<K, S>>>,
    seq: u64,
}

impl<K, S> LazyMinHeap<K, S>
where
    K: Eq + Hash + Copy,
    S: Ord + Copy,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            heap: BinaryHeap::with_capacity(capacity),
            seq: 0,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Heap length including stale snapshots.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    pub fn contains(&self, key: K) -> bool {
        self.scores.contains_key(&key)
    }

    pub fn score_of(&self, key: K) -> Option<S> {
        self.scores.get(&key).map(|&(score, _)| score)
    }

    /// Sets `key`'s score and returns the previous one, if any.
    pub fn update(&mut self, key: K, score: S) -> Option<S> {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(HeapEntry { score, seq, key }));
        self.scores.insert(key, (score, seq)).map(|(previous, _)| previous)
    }

    /// Forgets `key`; its snapshots turn stale.
    pub fn remove(&mut self, key: K) -> Option<S> {
        self.scores.remove(&key).map(|(score, _)| score)
    }

    /// Lowest-scored live key.
    pub fn peek_best(&mut self) -> Option<(K, S)> {
        self.prune();
        self.heap.peek().map(|Reverse(top)| (top.key, top.score))
    }

    /// Lowest-scored live key other than `excluded`.
    pub fn peek_best_excluding(&mut self, excluded: K) -> Option<(K, S)> {
        self.prune();
        let Reverse(top) = self.heap.peek()?;
        if top.key != excluded {
            return Some((top.key, top.score));
        }
        let held = self.heap.pop()?;
        self.prune();
        let next = self.heap.peek().map(|Reverse(top)| (top.key, top.score));
        self.heap.push(held);
        next
    }

    /// Replaces every live score with `adjust(key, score)` and rebuilds.
    pub fn adjust_all<F>(&mut self, mut adjust: F)
    where
        F: FnMut(K, S) -> S,
    {
        for (&key, entry) in self.scores.iter_mut() {
            entry.0 = adjust(key, entry.0);
        }
        self.rebuild();
    }

    /// Drops every stale snapshot.
    pub fn rebuild(&mut self) {
        let entries: Vec<_> = self
            .scores
            .iter()
            .map(|(&key, &(score, seq))| Reverse(HeapEntry { score, seq, key }))
            .collect();
        self.heap = BinaryHeap::from(entries);
    }

    /// Rebuilds once stale snapshots outnumber live keys.
    pub fn maybe_rebuild(&mut self) {
        if self.heap.len() > 2 * self.scores.len() + REBUILD_SLACK {
            self.rebuild();
        }
    }

    fn is_live(&self, entry: &HeapEntry<K, S>) -> bool {
        self.scores
            .get(&entry.key)
            .is_some_and(|&(score, seq)| score == entry.score && seq == entry.seq)
    }

    fn prune(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.is_live(top) {
                break;
            }
            self.heap.pop();
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let live = self.heap.iter().filter(|Reverse(entry)| self.is_live(entry)).count();
        ensure_invariant!(
            live == self.scores.len(),
            "{} live heap snapshots for {} scored keys",
            live,
            self.scores.len()
        );
        for &(_, seq) in self.scores.values() {
            ensure_invariant!(seq < self.seq, "sequence {} not yet issued", seq);
        }
        Ok(())
    }
}

impl<K, S> Default for LazyMinHeap<K, S>
where
    K: Eq + Hash + Copy,
    S: Ord + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(heap: &mut LazyMinHeap<u64, i64>) -> Vec<(u64, i64)> {
        let mut out = Vec::new();
        while let Some((key, score)) = heap.peek_best() {
            heap.remove(key);
            out.push((key, score));
        }
        out
    }

    // ==============================================
    // Ordering
    // ==============================================

    #[test]
    fn peeks_lowest_score_first() {
        let mut heap = LazyMinHeap::new();
        heap.update(1, 10);
        heap.update(2, 3);
        heap.update(3, 7);
        assert_eq!(drain(&mut heap), vec![(2, 3), (3, 7), (1, 10)]);
        assert!(heap.is_empty());
    }

    #[test]
    fn equal_scores_pop_least_recently_updated_first() {
        let mut heap = LazyMinHeap::new();
        heap.update(1, 4);
        heap.update(2, 4);
        heap.update(1, 4);
        assert_eq!(drain(&mut heap), vec![(2, 4), (1, 4)]);
    }

    #[test]
    fn stale_snapshots_are_skipped() {
        let mut heap = LazyMinHeap::new();
        heap.update(1, 1);
        heap.update(2, 5);
        assert_eq!(heap.update(1, 9), Some(1));
        assert_eq!(heap.heap_len(), 3);
        assert_eq!(heap.peek_best(), Some((2, 5)));
        assert_eq!(heap.score_of(1), Some(9));
        heap.check_invariants().unwrap();
    }

    #[test]
    fn removed_key_never_resurfaces() {
        let mut heap = LazyMinHeap::new();
        heap.update(1, 1);
        heap.update(2, 2);
        assert_eq!(heap.remove(1), Some(1));
        assert_eq!(heap.remove(1), None);
        assert_eq!(heap.peek_best(), Some((2, 2)));
        assert!(!heap.contains(1));
    }

    // ==============================================
    // Exclusion
    // ==============================================

    #[test]
    fn excluding_best_returns_runner_up_and_keeps_best() {
        let mut heap = LazyMinHeap::new();
        heap.update(1, 1);
        heap.update(2, 2);
        heap.update(3, 3);
        assert_eq!(heap.peek_best_excluding(1), Some((2, 2)));
        assert_eq!(heap.peek_best_excluding(2), Some((1, 1)));
        assert_eq!(heap.peek_best(), Some((1, 1)));
        heap.check_invariants().unwrap();
    }

    #[test]
    fn excluding_only_key_is_none() {
        let mut heap = LazyMinHeap::new();
        heap.update(1, 1);
        assert_eq!(heap.peek_best_excluding(1), None);
        assert_eq!(heap.peek_best(), Some((1, 1)));
    }

    // ==============================================
    // Bulk adjustment and rebuild
    // ==============================================

    #[test]
    fn adjust_all_rescores_and_keeps_tie_order() {
        let mut heap = LazyMinHeap::new();
        heap.update(1, 10);
        heap.update(2, 3);
        heap.update(3, 3);
        heap.adjust_all(|key, score| if key == 1 { score - 8 } else { score - 1 });
        assert_eq!(heap.heap_len(), 3);
        assert_eq!(drain(&mut heap), vec![(1, 2), (2, 2), (3, 2)]);
    }

    #[test]
    fn maybe_rebuild_drops_stale_snapshots() {
        let mut heap = LazyMinHeap::new();
        for round in 0..200 {
            heap.update(1, round);
        }
        assert_eq!(heap.heap_len(), 200);
        heap.maybe_rebuild();
        assert_eq!(heap.heap_len(), 1);
        assert_eq!(heap.peek_best(), Some((1, 199)));
        heap.check_invariants().unwrap();
    }
}
