//! Accumulated counters for one simulated policy.

use std::fmt;

use crate::metrics::snapshot::PolicyStatsSnapshot;
use crate::metrics::traits::StatsRecorder;

/// Named counter set owned by a policy instance.
///
/// # Example
///
/// ```
/// use cachesim::metrics::{PolicyStats, StatsRecorder};
///
/// let mut stats = PolicyStats::new("linked.Lfu");
/// stats.record_operation();
/// stats.record_weighted_miss(4);
/// stats.record_operation();
/// stats.record_weighted_hit(4);
///
/// let snapshot = stats.snapshot();
/// assert_eq!(snapshot.requests(), 2);
/// assert_eq!(snapshot.hit_rate(), 0.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyStats {
    name: String,
    counters: PolicyStatsSnapshot,
}

impl PolicyStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counters: PolicyStatsSnapshot::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn snapshot(&self) -> PolicyStatsSnapshot {
        self.counters
    }

    pub fn operations(&self) -> u64 {
        self.counters.operations
    }

    pub fn hits(&self) -> u64 {
        self.counters.hits
    }

    pub fn misses(&self) -> u64 {
        self.counters.misses
    }

    pub fn evictions(&self) -> u64 {
        self.counters.evictions
    }

    pub fn admissions(&self) -> u64 {
        self.counters.admissions
    }

    pub fn rejections(&self) -> u64 {
        self.counters.rejections
    }

    pub fn hit_rate(&self) -> f64 {
        self.counters.hit_rate()
    }
}

impl StatsRecorder for PolicyStats {
    #[inline]
    fn record_operation(&mut self) {
        self.counters.operations += 1;
    }

    #[inline]
    fn add_operations(&mut self, count: u64) {
        self.counters.operations += count;
    }

    #[inline]
    fn record_hit(&mut self) {
        self.counters.hits += 1;
    }

    #[inline]
    fn record_miss(&mut self) {
        self.counters.misses += 1;
    }

    #[inline]
    fn record_weighted_hit(&mut self, weight: u32) {
        self.counters.hits += 1;
        self.counters.hits_weight += u64::from(weight);
    }

    #[inline]
    fn record_weighted_miss(&mut self, weight: u32) {
        self.counters.misses += 1;
        self.counters.misses_weight += u64::from(weight);
    }

    #[inline]
    fn record_eviction(&mut self) {
        self.counters.evictions += 1;
    }

    #[inline]
    fn record_admission(&mut self) {
        self.counters.admissions += 1;
    }

    #[inline]
    fn record_rejection(&mut self) {
        self.counters.rejections += 1;
    }
}

impl fmt::Display for PolicyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.counters;
        write!(
            f,
            "{}: hit rate {:.2}%, requests {}, evictions {}, admissions {}, rejections {}",
            self.name,
            s.hit_rate() * 100.0,
            s.requests(),
            s.evictions,
            s.admissions,
            s.rejections
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_records_count_once() {
        let mut stats = PolicyStats::new("test");
        stats.record_weighted_hit(3);
        stats.record_weighted_miss(5);
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits_weight, 3);
        assert_eq!(snapshot.misses_weight, 5);
    }

    #[test]
    fn plain_records_do_not_touch_weight() {
        let mut stats = PolicyStats::new("test");
        stats.record_hit();
        stats.record_miss();
        stats.record_miss();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests(), 3);
        assert_eq!(snapshot.hits_weight + snapshot.misses_weight, 0);
    }

    #[test]
    fn operations_and_decisions_accumulate() {
        let mut stats = PolicyStats::new("test");
        stats.record_operation();
        stats.add_operations(4);
        stats.record_eviction();
        stats.record_admission();
        stats.record_rejection();
        stats.record_rejection();
        assert_eq!(stats.operations(), 5);
        assert_eq!(stats.evictions(), 1);
        assert_eq!(stats.admissions(), 1);
        assert_eq!(stats.rejections(), 2);
    }

    #[test]
    fn display_includes_name_and_rate() {
        let mut stats = PolicyStats::new("sampled.Lru");
        stats.record_hit();
        let line = stats.to_string();
        assert!(line.starts_with("sampled.Lru"));
        assert!(line.contains("100.00%"));
    }
}
