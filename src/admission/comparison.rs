//! Weight comparison admission.
//!
//! A candidate replaces its victim only when it is strictly heavier. When the
//! same victim (same key and weight) keeps being offered, its weight is
//! divided by the number of consecutive offers so it eventually gives way.

use crate::metrics::StatsRecorder;
use crate::traits::Admittor;

#[derive(Debug, Clone, Default)]
pub struct ComparisonAdmittor {
    previous_victim: Option<(u64, u32)>,
    repeats: u32,
}

impl ComparisonAdmittor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Admittor for ComparisonAdmittor {
    fn record(&mut self, _key: u64) {}

    fn admit(&mut self, candidate: u64, victim: u64, stats: &mut dyn StatsRecorder) -> bool {
        self.admit_weighted(candidate, 1, victim, 1, stats)
    }

    fn admit_weighted(
        &mut self,
        _candidate: u64,
        candidate_weight: u32,
        victim: u64,
        victim_weight: u32,
        stats: &mut dyn StatsRecorder,
    ) -> bool {
        let mut effective = victim_weight;
        if self.previous_victim == Some((victim, victim_weight)) {
            self.repeats += 1;
            effective /= self.repeats;
        } else {
            self.repeats = 1;
        }
        self.previous_victim = Some((victim, effective));

        let admit = candidate_weight > effective;
        if admit {
            stats.record_admission();
        } else {
            stats.record_rejection();
        }
        admit
    }
}
