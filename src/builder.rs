//! Unified builder for every simulated policy.
//!
//! A [`PolicyKind`] names the algorithm; the [`SimulatorConfig`] carries the
//! knobs it reads. The returned [`SimulatedPolicy`] dispatches to the concrete
//! policy through an enum, so callers drive any of them through [`Policy`].
//!
//! ## Example
//!
//! ```rust
//! use cachesim::builder::{PolicyBuilder, PolicyKind};
//! use cachesim::config::SimulatorConfig;
//! use cachesim::traits::{AccessEvent, Policy};
//!
//! let config = SimulatorConfig::builder(100).try_build().unwrap();
//! let kind: PolicyKind = "adaptive.lecar".parse().unwrap();
//! let mut policy = PolicyBuilder::new(config).build(kind).unwrap();
//!
//! let trace = (0..1_000u64).map(|i| AccessEvent::new(i % 150));
//! let snapshot = cachesim::builder::replay(&mut policy, trace);
//! assert_eq!(snapshot.requests(), 1_000);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::config::{EvictionRule, SimulatorConfig};
use crate::error::{ConfigError, InvariantError};
use crate::metrics::{PolicyStats, PolicyStatsSnapshot};
use crate::policy::adaptive::AdaptiveHybridPolicy;
use crate::policy::frequent::{FrequencyOrder, FrequentlyUsedPolicy};
use crate::policy::heap::{AgingPolicy, LfuHeapPolicy};
use crate::policy::sampled::SampledPolicy;
use crate::traits::{AccessEvent, AccessOutcome, Policy};

/// Available simulated policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// `linked.lfu`: exact LFU over a frequency ring.
    Lfu,
    /// `linked.mfu`: exact MFU over a frequency ring.
    Mfu,
    /// `linked.lfu-boost`: LFU with weight-boosted hits.
    LfuCostBoost,
    /// `heap.<aging>`: heap-ordered LFU with periodic frequency aging.
    LfuHeap(AgingPolicy),
    /// `sampled.<rule>`: sampled eviction with the given victim rule.
    Sampled(EvictionRule),
    /// `adaptive.lecar`: regret-weighted LRU/LFU hybrid.
    AdaptiveHybrid,
}

impl PolicyKind {
    pub const ALL: &'static [PolicyKind] = &[
        PolicyKind::Lfu,
        PolicyKind::Mfu,
        PolicyKind::LfuCostBoost,
        PolicyKind::LfuHeap(AgingPolicy::One),
        PolicyKind::LfuHeap(AgingPolicy::Boost),
        PolicyKind::LfuHeap(AgingPolicy::Skip),
        PolicyKind::LfuHeap(AgingPolicy::Disabled),
        PolicyKind::Sampled(EvictionRule::Fifo),
        PolicyKind::Sampled(EvictionRule::Lru),
        PolicyKind::Sampled(EvictionRule::Mru),
        PolicyKind::Sampled(EvictionRule::Lfu),
        PolicyKind::Sampled(EvictionRule::Mfu),
        PolicyKind::Sampled(EvictionRule::Random),
        PolicyKind::Sampled(EvictionRule::Hyperbolic),
        PolicyKind::AdaptiveHybrid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Lfu => "linked.lfu",
            PolicyKind::Mfu => "linked.mfu",
            PolicyKind::LfuCostBoost => "linked.lfu-boost",
            PolicyKind::LfuHeap(AgingPolicy::One) => "heap.one",
            PolicyKind::LfuHeap(AgingPolicy::Boost) => "heap.boost",
            PolicyKind::LfuHeap(AgingPolicy::Skip) => "heap.skip",
            PolicyKind::LfuHeap(AgingPolicy::Disabled) => "heap.none",
            PolicyKind::Sampled(EvictionRule::Fifo) => "sampled.fifo",
            PolicyKind::Sampled(EvictionRule::Lru) => "sampled.lru",
            PolicyKind::Sampled(EvictionRule::Mru) => "sampled.mru",
            PolicyKind::Sampled(EvictionRule::Lfu) => "sampled.lfu",
            PolicyKind::Sampled(EvictionRule::Mfu) => "sampled.mfu",
            PolicyKind::Sampled(EvictionRule::Random) => "sampled.random",
            PolicyKind::Sampled(EvictionRule::Hyperbolic) => "sampled.hyperbolic",
            PolicyKind::AdaptiveHybrid => "adaptive.lecar",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('_', "-");
        PolicyKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| ConfigError::new(format!("unknown policy: {s}")))
    }
}

/// Policy built by [`PolicyBuilder`].
#[derive(Debug, Clone)]
pub struct SimulatedPolicy {
    inner: PolicyInner,
}

#[derive(Debug, Clone)]
enum PolicyInner {
    Frequent(FrequentlyUsedPolicy),
    Heap(LfuHeapPolicy),
    Sampled(SampledPolicy),
    Adaptive(AdaptiveHybridPolicy),
}

impl SimulatedPolicy {
    pub fn as_frequent(&self) -> Option<&FrequentlyUsedPolicy> {
        match &self.inner {
            PolicyInner::Frequent(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn as_heap(&self) -> Option<&LfuHeapPolicy> {
        match &self.inner {
            PolicyInner::Heap(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn as_sampled(&self) -> Option<&SampledPolicy> {
        match &self.inner {
            PolicyInner::Sampled(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn as_adaptive(&self) -> Option<&AdaptiveHybridPolicy> {
        match &self.inner {
            PolicyInner::Adaptive(policy) => Some(policy),
            _ => None,
        }
    }
}

impl Policy for SimulatedPolicy {
    fn record(&mut self, event: AccessEvent) -> AccessOutcome {
        match &mut self.inner {
            PolicyInner::Frequent(policy) => policy.record(event),
            PolicyInner::Heap(policy) => policy.record(event),
            PolicyInner::Sampled(policy) => policy.record(event),
            PolicyInner::Adaptive(policy) => policy.record(event),
        }
    }

    fn stats(&self) -> &PolicyStats {
        match &self.inner {
            PolicyInner::Frequent(policy) => policy.stats(),
            PolicyInner::Heap(policy) => policy.stats(),
            PolicyInner::Sampled(policy) => policy.stats(),
            PolicyInner::Adaptive(policy) => policy.stats(),
        }
    }

    fn contains(&self, key: u64) -> bool {
        match &self.inner {
            PolicyInner::Frequent(policy) => policy.contains(key),
            PolicyInner::Heap(policy) => policy.contains(key),
            PolicyInner::Sampled(policy) => policy.contains(key),
            PolicyInner::Adaptive(policy) => policy.contains(key),
        }
    }

    fn len(&self) -> usize {
        match &self.inner {
            PolicyInner::Frequent(policy) => policy.len(),
            PolicyInner::Heap(policy) => policy.len(),
            PolicyInner::Sampled(policy) => policy.len(),
            PolicyInner::Adaptive(policy) => policy.len(),
        }
    }

    fn weighted_size(&self) -> u64 {
        match &self.inner {
            PolicyInner::Frequent(policy) => policy.weighted_size(),
            PolicyInner::Heap(policy) => policy.weighted_size(),
            PolicyInner::Sampled(policy) => policy.weighted_size(),
            PolicyInner::Adaptive(policy) => policy.weighted_size(),
        }
    }

    fn maximum_size(&self) -> u64 {
        match &self.inner {
            PolicyInner::Frequent(policy) => policy.maximum_size(),
            PolicyInner::Heap(policy) => policy.maximum_size(),
            PolicyInner::Sampled(policy) => policy.maximum_size(),
            PolicyInner::Adaptive(policy) => policy.maximum_size(),
        }
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        match &self.inner {
            PolicyInner::Frequent(policy) => policy.check_invariants(),
            PolicyInner::Heap(policy) => policy.check_invariants(),
            PolicyInner::Sampled(policy) => policy.check_invariants(),
            PolicyInner::Adaptive(policy) => policy.check_invariants(),
        }
    }
}

/// Builder for simulated policies sharing one configuration.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    config: SimulatorConfig,
}

impl PolicyBuilder {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Builds `kind`, failing on an invalid configuration.
    pub fn build(&self, kind: PolicyKind) -> Result<SimulatedPolicy, ConfigError> {
        let config = &self.config;
        let inner = match kind {
            PolicyKind::Lfu => {
                PolicyInner::Frequent(FrequentlyUsedPolicy::try_new(config, FrequencyOrder::Lfu)?)
            },
            PolicyKind::Mfu => {
                PolicyInner::Frequent(FrequentlyUsedPolicy::try_new(config, FrequencyOrder::Mfu)?)
            },
            PolicyKind::LfuCostBoost => PolicyInner::Frequent(FrequentlyUsedPolicy::try_new(
                config,
                FrequencyOrder::LfuCostBoost,
            )?),
            PolicyKind::LfuHeap(aging) => {
                PolicyInner::Heap(LfuHeapPolicy::try_new(config, aging)?)
            },
            PolicyKind::Sampled(rule) => {
                let config = SimulatorConfig {
                    eviction_rule: rule,
                    ..config.clone()
                };
                PolicyInner::Sampled(SampledPolicy::try_new(&config)?)
            },
            PolicyKind::AdaptiveHybrid => {
                PolicyInner::Adaptive(AdaptiveHybridPolicy::try_new(config)?)
            },
        };
        Ok(SimulatedPolicy { inner })
    }
}

/// Feeds every event to `policy`, calls [`Policy::finished`] and returns the
/// final counters.
pub fn replay<P, I>(policy: &mut P, events: I) -> PolicyStatsSnapshot
where
    P: Policy + ?Sized,
    I: IntoIterator<Item = AccessEvent>,
{
    for event in events {
        policy.record(event);
    }
    policy.finished();
    policy.stats().snapshot()
}
