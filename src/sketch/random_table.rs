//! Exact counting table that forgets by random removal.
//!
//! Counts are exact until the table holds `sample_size` recorded accesses.
//! From then on each new access first takes one count away from a uniformly
//! chosen tracked key, so the table stays a fixed-size sample of recent
//! traffic. Keys live in a dense vector next to the count map so the random
//! pick and its removal are O(1) (swap-remove).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::error::{InvariantError, ensure_invariant};
use crate::sketch::Frequency;

#[derive(Debug, Clone)]
pub struct RandomTable {
    /// key -> (index in `keys`, count)
    counts: FxHashMap<u64, (usize, u64)>,
    keys: Vec<u64>,
    total: u64,
    sample_size: u64,
    rng: SmallRng,
}

impl RandomTable {
    pub fn new(sample_size: u64, seed: u64) -> Self {
        Self {
            counts: FxHashMap::default(),
            keys: Vec::new(),
            total: 0,
            sample_size: sample_size.max(1),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Sum of all tracked counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct keys tracked.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn forget_one(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let index = self.rng.random_range(0..self.keys.len());
        let key = self.keys[index];
        let Some(entry) = self.counts.get_mut(&key) else {
            return;
        };
        entry.1 -= 1;
        self.total -= 1;
        if entry.1 == 0 {
            self.remove_key(index);
        }
    }

    fn remove_key(&mut self, index: usize) {
        let key = self.keys.swap_remove(index);
        self.counts.remove(&key);
        if let Some(&moved) = self.keys.get(index)
            && let Some(entry) = self.counts.get_mut(&moved)
        {
            entry.0 = index;
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        ensure_invariant!(
            self.keys.len() == self.counts.len(),
            "random table tracks {} keys but counts {}",
            self.keys.len(),
            self.counts.len()
        );
        let mut total = 0;
        for (index, key) in self.keys.iter().enumerate() {
            let Some(&(at, count)) = self.counts.get(key) else {
                return Err(InvariantError::new(format!("key {key} has no count")));
            };
            ensure_invariant!(at == index, "key {} indexed at {} but stored at {}", key, at, index);
            ensure_invariant!(count > 0, "key {} kept with zero count", key);
            total += count;
        }
        ensure_invariant!(total == self.total, "total {} disagrees with counts {}", self.total, total);
        Ok(())
    }
}

impl Frequency for RandomTable {
    fn increment(&mut self, key: u64) {
        if self.total >= self.sample_size {
            self.forget_one();
        }
        match self.counts.get_mut(&key) {
            Some(entry) => entry.1 += 1,
            None => {
                self.counts.insert(key, (self.keys.len(), 1));
                self.keys.push(key);
            },
        }
        self.total += 1;
    }

    fn estimate(&self, key: u64) -> u64 {
        self.counts.get(&key).map_or(0, |&(_, count)| count)
    }

    fn reset(&mut self) {
        let mut kept = Vec::with_capacity(self.keys.len());
        let mut total = 0;
        for key in self.keys.drain(..) {
            let Some(entry) = self.counts.get_mut(&key) else {
                continue;
            };
            entry.1 >>= 1;
            if entry.1 == 0 {
                self.counts.remove(&key);
            } else {
                entry.0 = kept.len();
                total += entry.1;
                kept.push(key);
            }
        }
        self.keys = kept;
        self.total = total;
        log::trace!("random table halved to {} keys", self.keys.len());
    }

    fn max_count(&self) -> u64 {
        self.sample_size
    }
}
