/// Point-in-time copy of a policy's counters with derived ratios.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PolicyStatsSnapshot {
    pub operations: u64,
    pub hits: u64,
    pub misses: u64,
    pub hits_weight: u64,
    pub misses_weight: u64,
    pub evictions: u64,
    pub admissions: u64,
    pub rejections: u64,
}

impl PolicyStatsSnapshot {
    /// Hits plus misses.
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.requests())
    }

    pub fn miss_rate(&self) -> f64 {
        ratio(self.misses, self.requests())
    }

    /// Share of requested weight that was served from the cache.
    pub fn weighted_hit_rate(&self) -> f64 {
        ratio(self.hits_weight, self.hits_weight + self.misses_weight)
    }

    /// Share of admission decisions that let the candidate in.
    pub fn admission_rate(&self) -> f64 {
        ratio(self.admissions, self.admissions + self.rejections)
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_rates_are_zero() {
        let snapshot = PolicyStatsSnapshot::default();
        assert_eq!(snapshot.hit_rate(), 0.0);
        assert_eq!(snapshot.weighted_hit_rate(), 0.0);
        assert_eq!(snapshot.admission_rate(), 0.0);
    }

    #[test]
    fn rates_follow_counters() {
        let snapshot = PolicyStatsSnapshot {
            hits: 3,
            misses: 1,
            hits_weight: 30,
            misses_weight: 70,
            admissions: 1,
            rejections: 3,
            ..Default::default()
        };
        assert_eq!(snapshot.requests(), 4);
        assert!((snapshot.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert!((snapshot.miss_rate() - 0.25).abs() < f64::EPSILON);
        assert!((snapshot.weighted_hit_rate() - 0.3).abs() < 1e-12);
        assert!((snapshot.admission_rate() - 0.25).abs() < f64::EPSILON);
    }
}
