//! Exact frequency table with periodic halving.
//!
//! The reference point for the approximate sketches: no collisions, no
//! saturation, same aging cadence.

use rustc_hash::FxHashMap;

use crate::sketch::Frequency;

#[derive(Debug, Clone)]
pub struct PerfectTable {
    counts: FxHashMap<u64, u64>,
    additions: u64,
    period: u64,
}

impl PerfectTable {
    pub fn new(period: u64) -> Self {
        Self {
            counts: FxHashMap::default(),
            additions: 0,
            period: period.max(1),
        }
    }

    /// Number of keys with a non-zero count.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl Frequency for PerfectTable {
    fn increment(&mut self, key: u64) {
        if self.additions >= self.period {
            self.reset();
        }
        *self.counts.entry(key).or_insert(0) += 1;
        self.additions += 1;
    }

    fn estimate(&self, key: u64) -> u64 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    fn reset(&mut self) {
        self.counts.retain(|_, count| {
            *count >>= 1;
            *count > 0
        });
        self.additions /= 2;
        log::trace!("perfect table halved to {} keys", self.counts.len());
    }

    fn max_count(&self) -> u64 {
        self.period
    }
}
