//! # Sampled Eviction
//!
//! Instead of keeping residents in an ordered structure, the policy keeps a
//! flat table and, when over capacity, inspects a small random sample of it.
//! The sampling strategy and the victim rule are independent axes chosen by
//! configuration.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────────┐
//!   │                        SampledPolicy                            │
//!   │                                                                 │
//!   │  index: FxHashMap<u64, usize>   table: Vec<SampleEntry>         │
//!   │     key ──────────────────────►  [e0][e1][e2][e3] ... [en]      │
//!   │                                        ▲                        │
//!   │  draw(strategy) ──► sample: [3, 0, 7] ─┘                        │
//!   │  select_victim(rule, sample) ──► victim position                │
//!   │  admittor.admit_weighted(candidate, victim)                     │
//!   └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Removal is a swap-remove on the table with the moved entry's index
//! patched, so every operation outside sampling is O(1).
//!
//! ## Record flow
//!
//! ```text
//!   record(key, w)            tick += 1
//!     ├─ admittor.record_access(key, w)
//!     ├─ hit  → frequency += 1, access_tick = tick
//!     └─ miss → weighted miss
//!          ├─ w > maximum_size → stop
//!          └─ append, then while size > maximum_size:
//!               sample (candidate excluded) → victim
//!               one eviction recorded
//!               admit? remove victim : remove candidate and stop
//! ```
//!
//! ## Example
//!
//! ```
//! use cachesim::config::{Admission, EvictionRule, SimulatorConfig};
//! use cachesim::policy::sampled::SampledPolicy;
//! use cachesim::traits::{AccessEvent, Policy};
//!
//! let config = SimulatorConfig::builder(3)
//!     .eviction_rule(EvictionRule::Lru)
//!     .admission(Admission::Always)
//!     .try_build()
//!     .unwrap();
//! let mut policy = SampledPolicy::try_new(&config).unwrap();
//! for key in [1, 2, 3, 1, 4] {
//!     policy.record(AccessEvent::new(key));
//! }
//! assert_eq!(policy.len(), 3);
//! assert!(policy.contains(4));
//! assert_eq!(policy.name(), "sampled.Lru");
//! ```

pub mod sample;
pub mod select;

pub use select::{SampleEntry, select_victim};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rustc_hash::FxHashMap;

use crate::admission::AdmissionFilter;
use crate::config::{EvictionRule, SampleStrategy, SimulatorConfig};
use crate::error::{ConfigError, InvariantError, ensure_invariant};
use crate::metrics::{PolicyStats, StatsRecorder};
use crate::traits::{AccessEvent, AccessOutcome, Admittor, Policy};

/// Sampling-based replacement.
#[derive(Debug, Clone)]
pub struct SampledPolicy {
    table: Vec<SampleEntry>,
    index: FxHashMap<u64, usize>,
    sample: Vec<usize>,
    strategy: SampleStrategy,
    rule: EvictionRule,
    sample_size: usize,
    admittor: AdmissionFilter,
    rng: SmallRng,
    tick: u64,
    maximum_size: u64,
    weighted_size: u64,
    stats: PolicyStats,
}

impl SampledPolicy {
    pub fn try_new(config: &SimulatorConfig) -> Result<Self, ConfigError> {
        let admittor = AdmissionFilter::from_config(config)?;
        let name = match admittor.label() {
            Some(label) => format!("sampled.{}_{label}", config.eviction_rule.label()),
            None => format!("sampled.{}", config.eviction_rule.label()),
        };
        log::debug!(
            "{name}: maximum size {}, {} sampling of {}",
            config.maximum_size,
            config.sample_strategy,
            config.sample_size
        );
        Ok(Self {
            table: Vec::new(),
            index: FxHashMap::default(),
            sample: Vec::with_capacity(config.sample_size.min(1 << 16)),
            strategy: config.sample_strategy,
            rule: config.eviction_rule,
            sample_size: config.sample_size,
            admittor,
            rng: SmallRng::seed_from_u64(config.random_seed),
            tick: 0,
            maximum_size: config.maximum_size,
            weighted_size: 0,
            stats: PolicyStats::new(name),
        })
    }

    pub fn rule(&self) -> EvictionRule {
        self.rule
    }

    pub fn strategy(&self) -> SampleStrategy {
        self.strategy
    }

    /// Number of records processed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn entry(&self, key: u64) -> Option<&SampleEntry> {
        self.index.get(&key).map(|&at| &self.table[at])
    }

    fn on_miss(&mut self, key: u64, weight: u32) {
        if u64::from(weight) > self.maximum_size {
            return;
        }
        self.index.insert(key, self.table.len());
        self.table.push(SampleEntry::inserted(key, weight, self.tick));
        self.weighted_size += u64::from(weight);
        self.evict(key);
    }

    fn evict(&mut self, candidate_key: u64) {
        while self.weighted_size > self.maximum_size {
            let Some(&candidate) = self.index.get(&candidate_key) else {
                break;
            };
            sample::draw(
                self.strategy,
                self.table.len(),
                Some(candidate),
                self.sample_size,
                &mut self.rng,
                &mut self.sample,
            );
            self.stats.add_operations(self.sample.len() as u64);
            let Some(at) =
                select_victim(self.rule, &self.table, &self.sample, self.tick, &mut self.rng)
            else {
                break;
            };
            let victim = self.sample[at];
            self.stats.record_eviction();

            let cand = self.table[candidate];
            let vict = self.table[victim];
            if self.admittor.admit_weighted(
                cand.key,
                cand.weight,
                vict.key,
                vict.weight,
                &mut self.stats,
            ) {
                self.remove_at(victim);
            } else {
                self.remove_at(candidate);
                break;
            }
        }
    }

    fn remove_at(&mut self, at: usize) {
        let removed = self.table.swap_remove(at);
        self.index.remove(&removed.key);
        if let Some(moved) = self.table.get(at) {
            self.index.insert(moved.key, at);
        }
        self.weighted_size -= u64::from(removed.weight);
    }
}

impl Policy for SampledPolicy {
    fn record(&mut self, event: AccessEvent) -> AccessOutcome {
        let AccessEvent { key, weight } = event;
        self.tick += 1;
        self.stats.record_operation();
        self.admittor.record_access(key, weight);

        match self.index.get(&key) {
            Some(&at) => {
                self.stats.record_weighted_hit(weight);
                let entry = &mut self.table[at];
                entry.frequency += 1;
                entry.access_tick = self.tick;
                AccessOutcome::Hit
            },
            None => {
                self.stats.record_weighted_miss(weight);
                self.on_miss(key, weight);
                AccessOutcome::Miss
            },
        }
    }

    fn stats(&self) -> &PolicyStats {
        &self.stats
    }

    fn contains(&self, key: u64) -> bool {
        self.index.contains_key(&key)
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn weighted_size(&self) -> u64 {
        self.weighted_size
    }

    fn maximum_size(&self) -> u64 {
        self.maximum_size
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        ensure_invariant!(
            self.index.len() == self.table.len(),
            "index holds {} keys but table {}",
            self.index.len(),
            self.table.len()
        );
        let mut weight = 0u64;
        for (at, entry) in self.table.iter().enumerate() {
            ensure_invariant!(
                self.index.get(&entry.key) == Some(&at),
                "key {} at position {} is not indexed there",
                entry.key,
                at
            );
            ensure_invariant!(
                entry.insertion_tick <= entry.access_tick && entry.access_tick <= self.tick,
                "key {} has ticks {}..{} past {}",
                entry.key,
                entry.insertion_tick,
                entry.access_tick,
                self.tick
            );
            weight += u64::from(entry.weight);
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
