//! # Frequency-Ordered Policies (LFU, MFU, cost-boosted LFU)
//!
//! Residents live in a [`FrequencyRing`]; the victim is read off one end of
//! the ring in O(1) and an admission filter decides whether the miss
//! candidate or the victim leaves.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                   FrequentlyUsedPolicy                           │
//!   │                                                                  │
//!   │   data: FxHashMap<u64, SlotId>  ──►  ring: FrequencyRing<Resident>│
//!   │                                                                  │
//!   │     c=1: [k7][k3]     c=2: [k1]     c=9: [k4]                     │
//!   │       ▲                                   ▲                      │
//!   │       └── LFU victim (oldest, lowest)     └── MFU victim          │
//!   │                                                                  │
//!   │   admittor: AdmissionFilter      stats: PolicyStats              │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Record flow
//!
//! ```text
//!   record(key, w)
//!     ├─ admittor.record_access(key, w)
//!     ├─ hit  → weighted hit; touch (+1, or +boost for LfuCostBoost)
//!     └─ miss → weighted miss
//!          ├─ w > maximum_size → stop (never inserted)
//!          └─ insert at count 1, then while size > maximum_size:
//!               victim = extreme entry other than the candidate
//!               admit?  evict victim : evict candidate
//!               one eviction recorded per round
//! ```
//!
//! ## Example
//!
//! ```
//! use cachesim::config::{Admission, SimulatorConfig};
//! use cachesim::policy::frequent::{FrequencyOrder, FrequentlyUsedPolicy};
//! use cachesim::traits::{AccessEvent, AccessOutcome, Policy};
//!
//! let config = SimulatorConfig::builder(2)
//!     .admission(Admission::Always)
//!     .try_build()
//!     .unwrap();
//! let mut lfu = FrequentlyUsedPolicy::try_new(&config, FrequencyOrder::Lfu).unwrap();
//!
//! let outcomes: Vec<_> = [1, 2, 1, 3]
//!     .into_iter()
//!     .map(|key| lfu.record(AccessEvent::new(key)))
//!     .collect();
//! assert_eq!(outcomes[2], AccessOutcome::Hit);
//! assert!(lfu.contains(1));
//! assert!(!lfu.contains(2));
//! lfu.finished();
//! ```

use std::fmt;

use rustc_hash::FxHashMap;

use crate::admission::{AdmissionFilter, boost_increment};
use crate::config::SimulatorConfig;
use crate::ds::{FrequencyRing, SlotId};
use crate::error::{ConfigError, InvariantError, ensure_invariant};
use crate::metrics::{PolicyStats, StatsRecorder};
use crate::traits::{AccessEvent, AccessOutcome, Admittor, Policy};

/// Which end of the ring is evicted, and how hits are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyOrder {
    /// Evict the least frequent entry.
    Lfu,
    /// Evict the most frequent entry.
    Mfu,
    /// LFU where a hit on a heavy entry counts `max(1, ln(weight / 512))`.
    LfuCostBoost,
}

impl fmt::Display for FrequencyOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrequencyOrder::Lfu => "Lfu",
            FrequencyOrder::Mfu => "Mfu",
            FrequencyOrder::LfuCostBoost => "LfuCostBoost",
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Resident {
    key: u64,
    weight: u32,
}

/// LFU / MFU replacement over an O(1) frequency ring.
#[derive(Debug, Clone)]
pub struct FrequentlyUsedPolicy {
    data: FxHashMap<u64, SlotId>,
    ring: FrequencyRing<Resident>,
    admittor: AdmissionFilter,
    order: FrequencyOrder,
    maximum_size: u64,
    weighted_size: u64,
    stats: PolicyStats,
}

impl FrequentlyUsedPolicy {
    /// Builds the policy and the admission filter named by `config`.
    pub fn try_new(config: &SimulatorConfig, order: FrequencyOrder) -> Result<Self, ConfigError> {
        let admittor = AdmissionFilter::from_config(config)?;
        Ok(Self::with_admittor(config.maximum_size, order, admittor))
    }

    /// Builds the policy around an existing admission filter.
    pub fn with_admittor(maximum_size: u64, order: FrequencyOrder, admittor: AdmissionFilter) -> Self {
        let name = match admittor.label() {
            Some(label) => format!("linked.{order}_{label}"),
            None => format!("linked.{order}"),
        };
        log::debug!("{name}: maximum size {maximum_size}");
        let capacity = usize::try_from(maximum_size).unwrap_or(0).min(1 << 20);
        Self {
            data: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            ring: FrequencyRing::with_capacity(capacity),
            admittor,
            order,
            maximum_size,
            weighted_size: 0,
            stats: PolicyStats::new(name),
        }
    }

    pub fn order(&self) -> FrequencyOrder {
        self.order
    }

    /// Access count of a resident key.
    pub fn frequency(&self, key: u64) -> Option<u64> {
        self.data.get(&key).and_then(|&id| self.ring.count(id))
    }

    /// Resident keys from the lowest count to the highest, FIFO within a count.
    pub fn keys_by_frequency(&self) -> Vec<u64> {
        self.ring.iter().map(|(_, _, resident)| resident.key).collect()
    }

    fn on_hit(&mut self, id: SlotId, weight: u32) {
        match self.order {
            FrequencyOrder::LfuCostBoost => {
                self.ring.touch_by(id, u64::from(boost_increment(weight)));
            },
            FrequencyOrder::Lfu | FrequencyOrder::Mfu => {
                self.ring.touch(id);
            },
        }
    }

    fn on_miss(&mut self, key: u64, weight: u32) {
        if u64::from(weight) > self.maximum_size {
            return;
        }
        let candidate = self.ring.insert(Resident { key, weight });
        self.data.insert(key, candidate);
        self.weighted_size += u64::from(weight);
        self.evict(candidate);
    }

    fn next_victim(&self, candidate: SlotId) -> Option<SlotId> {
        match self.order {
            FrequencyOrder::Mfu => self.ring.most_frequent_excluding(candidate),
            FrequencyOrder::Lfu | FrequencyOrder::LfuCostBoost => {
                self.ring.least_frequent_excluding(candidate)
            },
        }
    }

    fn evict(&mut self, candidate: SlotId) {
        while self.weighted_size > self.maximum_size {
            let Some(victim) = self.next_victim(candidate) else {
                break;
            };
            let cand = self.ring[candidate];
            let vict = self.ring[victim];
            let admit = self.admittor.admit_weighted(
                cand.key,
                cand.weight,
                vict.key,
                vict.weight,
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

    fn remove(&mut self, id: SlotId) {
        let resident = self.ring.remove(id);
        self.data.remove(&resident.key);
        self.weighted_size -= u64::from(resident.weight);
    }
}

impl Policy for FrequentlyUsedPolicy {
    fn record(&mut self, event: AccessEvent) -> AccessOutcome {
        let AccessEvent { key, weight } = event;
        self.stats.record_operation();
        self.admittor.record_access(key, weight);

        match self.data.get(&key) {
            Some(&id) => {
                self.stats.record_weighted_hit(weight);
                self.on_hit(id, weight);
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
        self.data.contains_key(&key)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn weighted_size(&self) -> u64 {
        self.weighted_size
    }

    fn maximum_size(&self) -> u64 {
        self.maximum_size
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        self.ring.check_invariants()?;
        ensure_invariant!(
            self.data.len() == self.ring.len(),
            "index holds {} keys but ring links {}",
            self.data.len(),
            self.ring.len()
        );
        let mut weight = 0u64;
        for (id, _, resident) in self.ring.iter() {
            ensure_invariant!(
                self.data.get(&resident.key) == Some(&id),
                "key {} is linked but not indexed",
                resident.key
            );
            weight += u64::from(resident.weight);
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
