//! Weight-threshold admission with a self-tuning threshold.
//!
//! The candidate is admitted when its weight is below the threshold (above
//! it when cost-aware). The threshold starts wide open and, after every
//! decision, moves halfway toward `admitted_weight * stuck / maximum_size`.
//! `stuck` resets on admission and drifts by [`DRIFT`] on every rejection, so
//! a long rejection streak gradually loosens the threshold again.

use crate::metrics::StatsRecorder;
use crate::traits::Admittor;

const DRIFT: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct ThresholdAdmittor {
    threshold: f64,
    admitted_weight: i64,
    stuck: f64,
    maximum_size: f64,
    cost_aware: bool,
}

impl ThresholdAdmittor {
    pub fn new(maximum_size: u64, cost_aware: bool) -> Self {
        Self {
            threshold: if cost_aware { f64::MIN_POSITIVE } else { f64::MAX },
            admitted_weight: 0,
            stuck: 1.0,
            maximum_size: maximum_size.max(1) as f64,
            cost_aware,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn retune(&mut self) {
        let target = self.admitted_weight as f64 * self.stuck / self.maximum_size;
        self.threshold = (self.threshold + target) / 2.0;
    }
}

impl Admittor for ThresholdAdmittor {
    fn record(&mut self, _key: u64) {}

    fn admit(&mut self, _candidate: u64, _victim: u64, _stats: &mut dyn StatsRecorder) -> bool {
        true
    }

    fn admit_weighted(
        &mut self,
        _candidate: u64,
        candidate_weight: u32,
        _victim: u64,
        victim_weight: u32,
        stats: &mut dyn StatsRecorder,
    ) -> bool {
        let weight = f64::from(candidate_weight);
        let passes = if self.cost_aware {
            weight > self.threshold
        } else {
            weight < self.threshold
        };

        if passes {
            self.admitted_weight += i64::from(candidate_weight) - i64::from(victim_weight);
            self.stuck = 1.0;
        } else if self.cost_aware {
            self.stuck -= DRIFT;
        } else {
            self.stuck += DRIFT;
        }
        self.retune();

        if passes {
            stats.record_admission();
        } else {
            stats.record_rejection();
        }
        passes
    }
}
