//! # Heap LFU with Frequency Aging
//!
//! Residents are ranked by frequency in a [`LazyMinHeap`]. A newcomer does
//! not start at one: it inherits the lowest resident frequency. Once the
//! warm-up is over, every resident frequency is periodically lowered by an
//! [`AgingPolicy`]-dependent decrement.
//!
//! ```text
//!   record(key, w)
//!     ├─ admittor.record_access(key, w)
//!     ├─ hit  → weighted hit; frequency + 1
//!     ├─ miss → weighted miss
//!     │    ├─ w > maximum_size → stop
//!     │    └─ insert at min(resident frequencies) (1 when empty)
//!     │       while size > maximum_size:
//!     │         victim = lowest frequency other than the candidate
//!     │         admit?  evict victim : evict candidate
//!     └─ tick += 1; every AGING_PERIOD ticks past AGING_START → age
//! ```
//!
//! | Aging    | Decrement per aging round                          |
//! |----------|----------------------------------------------------|
//! | `one`    | 1                                                  |
//! | `boost`  | `max(1, ln(w) * e^(-w / 512))`, truncated          |
//! | `skip`   | 1, or 0 for entries heavier than [`SKIP_WEIGHT`]   |
//! | `none`   | 0                                                  |
//!
//! Frequencies are signed: aging keeps lowering them past zero.
//!
//! ## Example
//!
//! ```
//! use cachesim::config::{Admission, SimulatorConfig};
//! use cachesim::policy::heap::{AgingPolicy, LfuHeapPolicy};
//! use cachesim::traits::{AccessEvent, Policy};
//!
//! let config = SimulatorConfig::builder(2)
//!     .admission(Admission::Always)
//!     .try_build()
//!     .unwrap();
//! let mut heap = LfuHeapPolicy::try_new(&config, AgingPolicy::One).unwrap();
//! for key in [1, 1, 1, 2] {
//!     heap.record(AccessEvent::new(key));
//! }
//! assert_eq!(heap.frequency(2), Some(3));
//! assert_eq!(heap.name(), "heap.One");
//! heap.finished();
//! ```

use std::fmt;

use rustc_hash::FxHashMap;

use crate::admission::AdmissionFilter;
use crate::config::SimulatorConfig;
use crate::ds::LazyMinHeap;
use crate::error::{ConfigError, InvariantError, ensure_invariant};
use crate::metrics::{PolicyStats, StatsRecorder};
use crate::traits::{AccessEvent, AccessOutcome, Admittor, Policy};

/// Ticks before the first aging round.
pub const AGING_START: u64 = 10_000;
/// Ticks between aging rounds.
pub const AGING_PERIOD: u64 = 100;
/// Entries heavier than this are spared by [`AgingPolicy::Skip`].
pub const SKIP_WEIGHT: u32 = 10_000;

/// How resident frequencies decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgingPolicy {
    One,
    Boost,
    Skip,
    Disabled,
}

impl AgingPolicy {
    pub const ALL: &'static [AgingPolicy] = &[
        AgingPolicy::One,
        AgingPolicy::Boost,
        AgingPolicy::Skip,
        AgingPolicy::Disabled,
    ];

    /// Name used in policy labels, e.g. `Boost`.
    pub fn label(self) -> &'static str {
        match self {
            AgingPolicy::One => "One",
            AgingPolicy::Boost => "Boost",
            AgingPolicy::Skip => "Skip",
            AgingPolicy::Disabled => "None",
        }
    }

    /// Amount one aging round takes off an entry of `weight`.
    pub fn decrement(self, weight: u32) -> i64 {
        match self {
            AgingPolicy::One => 1,
            AgingPolicy::Boost => {
                let weight = f64::from(weight);
                (weight.ln() * (-weight / 512.0).exp()).max(1.0) as i64
            },
            AgingPolicy::Skip if weight > SKIP_WEIGHT => 0,
            AgingPolicy::Skip => 1,
            AgingPolicy::Disabled => 0,
        }
    }
}

impl fmt::Display for AgingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// LFU over a lazily invalidated min-heap, with periodic frequency aging.
#[derive(Debug, Clone)]
pub struct LfuHeapPolicy {
    weights: FxHashMap<u64, u32>,
    heap: LazyMinHeap<u64, i64>,
    admittor: AdmissionFilter,
    aging: AgingPolicy,
    tick: u64,
    maximum_size: u64,
    weighted_size: u64,
    stats: PolicyStats,
}

impl LfuHeapPolicy {
    /// Builds the policy and the admission filter named by `config`.
    pub fn try_new(config: &SimulatorConfig, aging: AgingPolicy) -> Result<Self, ConfigError> {
        let admittor = AdmissionFilter::from_config(config)?;
        Ok(Self::with_admittor(config.maximum_size, aging, admittor))
    }

    /// Builds the policy around an existing admission filter.
    pub fn with_admittor(maximum_size: u64, aging: AgingPolicy, admittor: AdmissionFilter) -> Self {
        let name = match admittor.label() {
            Some(label) => format!("heap.{aging}_{label}"),
            None => format!("heap.{aging}"),
        };
        log::debug!("{name}: maximum size {maximum_size}");
        let capacity = usize::try_from(maximum_size).unwrap_or(0).min(1 << 20);
        Self {
            weights: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            heap: LazyMinHeap::with_capacity(capacity),
            admittor,
            aging,
            tick: 0,
            maximum_size,
            weighted_size: 0,
            stats: PolicyStats::new(name),
        }
    }

    pub fn aging(&self) -> AgingPolicy {
        self.aging
    }

    /// Requests recorded so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current (possibly aged) frequency of a resident key.
    pub fn frequency(&self, key: u64) -> Option<i64> {
        self.heap.score_of(key)
    }

    fn on_hit(&mut self, key: u64) {
        if let Some(frequency) = self.heap.score_of(key) {
            self.heap.update(key, frequency + 1);
        }
    }

    fn on_miss(&mut self, key: u64, weight: u32) {
        if u64::from(weight) > self.maximum_size {
            return;
        }
        let start = self.heap.peek_best().map_or(1, |(_, frequency)| frequency);
        self.heap.update(key, start);
        self.weights.insert(key, weight);
        self.weighted_size += u64::from(weight);
        self.evict(key);
    }

    fn evict(&mut self, candidate: u64) {
        while self.weighted_size > self.maximum_size {
            let Some((victim, _)) = self.heap.peek_best_excluding(candidate) else {
                break;
            };
            let admit = self.admittor.admit_weighted(
                candidate,
                self.weights[&candidate],
                victim,
                self.weights[&victim],
                &mut self.stats,
            );
            self.stats.record_eviction();
            if admit {
                self.remove(victim);
            } else {
                self.remove(candidate);
                break;
            }
        }
    }

    fn remove(&mut self, key: u64) {
        self.heap.remove(key);
        if let Some(weight) = self.weights.remove(&key) {
            self.weighted_size -= u64::from(weight);
        }
    }

    fn age(&mut self) {
        if self.tick <= AGING_START || !self.tick.is_multiple_of(AGING_PERIOD) {
            return;
        }
        if self.aging == AgingPolicy::Disabled {
            return;
        }
        let aging = self.aging;
        let weights = &self.weights;
        self.heap.adjust_all(|key, frequency| {
            let weight = weights.get(&key).copied().unwrap_or(1);
            frequency - aging.decrement(weight)
        });
        log::trace!("{}: aged {} residents at tick {}", self.stats.name(), weights.len(), self.tick);
    }
}

impl Policy for LfuHeapPolicy {
    fn record(&mut self, event: AccessEvent) -> AccessOutcome {
        let AccessEvent { key, weight } = event;
        self.stats.record_operation();
        self.admittor.record_access(key, weight);

        let outcome = if self.weights.contains_key(&key) {
            self.stats.record_weighted_hit(weight);
            self.on_hit(key);
            AccessOutcome::Hit
        } else {
            self.stats.record_weighted_miss(weight);
            self.on_miss(key, weight);
            AccessOutcome::Miss
        };
        self.tick += 1;
        self.age();
        self.heap.maybe_rebuild();
        outcome
    }

    fn stats(&self) -> &PolicyStats {
        &self.stats
    }

    fn contains(&self, key: u64) -> bool {
        self.weights.contains_key(&key)
    }

    fn len(&self) -> usize {
        self.weights.len()
    }

    fn weighted_size(&self) -> u64 {
        self.weighted_size
    }

    fn maximum_size(&self) -> u64 {
        self.maximum_size
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        self.heap.check_invariants()?;
        ensure_invariant!(
            self.heap.len() == self.weights.len(),
            "heap ranks {} keys but {} are resident",
            self.heap.len(),
            self.weights.len()
        );
        let mut weight = 0u64;
        for (&key, &resident) in &self.weights {
            ensure_invariant!(self.heap.contains(key), "key {} is resident but unranked", key);
            weight += u64::from(resident);
        }
        ensure_invariant!(
            weight == self.weighted_size,
            "tracked size {} disagrees with resident weight {}",
            self.weighted_size,
            weight
        );
        ensure_invariant!(
            self.weighted_size <= self.maximum_size,
            "size {} exceeds maximum {}",
            self.weighted_size,
            self.maximum_size
        );
        Ok(())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: weighted size never exceeds capacity and bookkeeping stays consistent
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_capacity_and_invariants(
            max in 1u64..32,
            aging_idx in 0usize..4,
            events in prop::collection::vec((0u64..64, 1u32..8), 0..300)
        ) {
            let aging = AgingPolicy::ALL[aging_idx];
            let mut heap = LfuHeapPolicy::with_admittor(max, aging, AdmissionFilter::Always);
            for (key, weight) in events {
                heap.record(AccessEvent::weighted(key, weight));
                prop_assert!(heap.weighted_size() <= max);
            }
            prop_assert!(heap.check_invariants().is_ok());
        }
    }
}
