//! Victim rules applied to a sample.
//!
//! Every rule scans the sample once and keeps the first entry that is
//! strictly better than the best so far, so ties resolve to the earliest
//! position in the sample.

use rand::Rng;

use crate::config::EvictionRule;

/// Per-entry metadata the rules read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleEntry {
    pub key: u64,
    pub weight: u32,
    pub insertion_tick: u64,
    pub access_tick: u64,
    pub frequency: u64,
}

impl SampleEntry {
    /// Entry created by a miss at `tick`; the inserting access counts once.
    pub fn inserted(key: u64, weight: u32, tick: u64) -> Self {
        Self {
            key,
            weight,
            insertion_tick: tick,
            access_tick: tick,
            frequency: 1,
        }
    }

    /// `frequency / max(1, now - insertion_tick)`.
    pub fn hyperbolic_score(&self, now: u64) -> f64 {
        let age = now.saturating_sub(self.insertion_tick).max(1);
        self.frequency as f64 / age as f64
    }
}

/// Returns the position within `sample` of the entry `rule` evicts.
pub fn select_victim<R: Rng>(
    rule: EvictionRule,
    table: &[SampleEntry],
    sample: &[usize],
    now: u64,
    rng: &mut R,
) -> Option<usize> {
    if sample.is_empty() {
        return None;
    }
    let entry = |at: usize| &table[sample[at]];
    let chosen = match rule {
        EvictionRule::Fifo => first_min(sample.len(), |at| entry(at).insertion_tick),
        EvictionRule::Lru => first_min(sample.len(), |at| entry(at).access_tick),
        EvictionRule::Mru => first_max(sample.len(), |at| entry(at).access_tick),
        EvictionRule::Lfu => first_min(sample.len(), |at| entry(at).frequency),
        EvictionRule::Mfu => first_max(sample.len(), |at| entry(at).frequency),
        EvictionRule::Random => rng.random_range(0..sample.len()),
        EvictionRule::Hyperbolic => {
            first_min(sample.len(), |at| entry(at).hyperbolic_score(now))
        },
    };
    Some(chosen)
}

fn first_min<T: PartialOrd>(len: usize, score: impl Fn(usize) -> T) -> usize {
    let mut best = 0;
    let mut best_score = score(0);
    for at in 1..len {
        let candidate = score(at);
        if candidate < best_score {
            best = at;
            best_score = candidate;
        }
    }
    best
}

fn first_max<T: PartialOrd>(len: usize, score: impl Fn(usize) -> T) -> usize {
    let mut best = 0;
    let mut best_score = score(0);
    for at in 1..len {
        let candidate = score(at);
        if candidate > best_score {
            best = at;
            best_score = candidate;
        }
    }
    best
}
