//! Admission filters.
//!
//! When a policy must evict, it names its victim and asks the filter whether
//! the miss candidate deserves the space. [`AdmissionFilter`] is the closed set
//! of filters selectable through [`Admission`]:
//!
//! | Admission        | Decision                                                  |
//! |------------------|-----------------------------------------------------------|
//! | `always`         | candidate always wins, nothing recorded                   |
//! | `tinylfu`        | higher sketch estimate wins; ties broken by weight        |
//! | `tinylfu-boost`  | as `tinylfu`, heavy keys recorded with a log-scaled boost |
//! | `threshold`      | candidate weight against a hill-climbed threshold         |
//! | `comparison`     | heavier wins; a repeated victim is progressively discounted |

pub mod comparison;
pub mod threshold;
pub mod tinylfu;

pub use comparison::ComparisonAdmittor;
pub use threshold::ThresholdAdmittor;
pub use tinylfu::{TieBreak, TinyLfu};

use crate::config::{Admission, SimulatorConfig};
use crate::error::ConfigError;
use crate::metrics::StatsRecorder;
use crate::sketch::FrequencySketch;
use crate::traits::Admittor;

/// Weight at which a cost boost starts exceeding one increment.
const BOOST_BASE_WEIGHT: f64 = 512.0;

/// Increment applied to a key of `weight` by cost-boosted structures:
/// `max(1, ln(weight / 512))`.
pub fn boost_increment(weight: u32) -> u32 {
    let boost = (f64::from(weight) / BOOST_BASE_WEIGHT).ln();
    if boost > 1.0 { boost as u32 } else { 1 }
}

/// Filter selected by configuration.
#[derive(Debug, Clone)]
pub enum AdmissionFilter {
    Always,
    TinyLfu(TinyLfu),
    Threshold(ThresholdAdmittor),
    Comparison(ComparisonAdmittor),
}

impl AdmissionFilter {
    pub fn from_config(config: &SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let filter = match config.admission {
            Admission::Always => AdmissionFilter::Always,
            Admission::TinyLfu => {
                let tie = if config.is_cost_aware {
                    TieBreak::PreferHeavier
                } else {
                    TieBreak::PreferLighter
                };
                AdmissionFilter::TinyLfu(TinyLfu::new(FrequencySketch::from_config(config)?, tie))
            },
            Admission::TinyLfuBoost => AdmissionFilter::TinyLfu(TinyLfu::boosted(
                FrequencySketch::from_config(config)?,
            )),
            Admission::Threshold => AdmissionFilter::Threshold(ThresholdAdmittor::new(
                config.maximum_size,
                config.is_cost_aware,
            )),
            Admission::Comparison => AdmissionFilter::Comparison(ComparisonAdmittor::new()),
        };
        Ok(filter)
    }

    /// Suffix appended to policy names; `None` for `always`.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            AdmissionFilter::Always => None,
            AdmissionFilter::TinyLfu(filter) if filter.is_boosted() => Some("TinyLfuBoost"),
            AdmissionFilter::TinyLfu(_) => Some("TinyLfu"),
            AdmissionFilter::Threshold(_) => Some("Threshold"),
            AdmissionFilter::Comparison(_) => Some("Comparison"),
        }
    }
}

impl Admittor for AdmissionFilter {
    fn record(&mut self, key: u64) {
        if let AdmissionFilter::TinyLfu(filter) = self {
            filter.record(key);
        }
    }

    fn record_by(&mut self, key: u64, amount: u32) {
        if let AdmissionFilter::TinyLfu(filter) = self {
            filter.record_by(key, amount);
        }
    }

    fn record_access(&mut self, key: u64, weight: u32) {
        if let AdmissionFilter::TinyLfu(filter) = self {
            filter.record_access(key, weight);
        }
    }

    fn admit(&mut self, candidate: u64, victim: u64, stats: &mut dyn StatsRecorder) -> bool {
        match self {
            AdmissionFilter::Always => true,
            AdmissionFilter::TinyLfu(filter) => filter.admit(candidate, victim, stats),
            AdmissionFilter::Threshold(filter) => filter.admit(candidate, victim, stats),
            AdmissionFilter::Comparison(filter) => filter.admit(candidate, victim, stats),
        }
    }

    fn admit_weighted(
        &mut self,
        candidate: u64,
        candidate_weight: u32,
        victim: u64,
        victim_weight: u32,
        stats: &mut dyn StatsRecorder,
    ) -> bool {
        match self {
            AdmissionFilter::Always => true,
            AdmissionFilter::TinyLfu(filter) => {
                filter.admit_weighted(candidate, candidate_weight, victim, victim_weight, stats)
            },
            AdmissionFilter::Threshold(filter) => {
                filter.admit_weighted(candidate, candidate_weight, victim, victim_weight, stats)
            },
            AdmissionFilter::Comparison(filter) => {
                filter.admit_weighted(candidate, candidate_weight, victim, victim_weight, stats)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PolicyStats;

    fn filter(admission: Admission) -> AdmissionFilter {
        let config = SimulatorConfig::builder(64)
            .admission(admission)
            .try_build()
            .unwrap();
        AdmissionFilter::from_config(&config).unwrap()
    }

    #[test]
    fn boost_is_at_least_one() {
        assert_eq!(boost_increment(1), 1);
        assert_eq!(boost_increment(512), 1);
        assert_eq!(boost_increment(512 * 3), 1);
        assert_eq!(boost_increment(512 * 8), 2);
        assert_eq!(boost_increment(u32::MAX), 15);
    }

    #[test]
    fn always_admits_without_recording() {
        let mut always = filter(Admission::Always);
        let mut stats = PolicyStats::new("test");
        assert!(always.admit(1, 2, &mut stats));
        assert!(always.admit_weighted(1, 1, 2, 100, &mut stats));
        assert_eq!(stats.admissions() + stats.rejections(), 0);
        assert_eq!(always.label(), None);
    }

    #[test]
    fn labels_follow_configuration() {
        assert_eq!(filter(Admission::TinyLfu).label(), Some("TinyLfu"));
        assert_eq!(filter(Admission::TinyLfuBoost).label(), Some("TinyLfuBoost"));
        assert_eq!(filter(Admission::Threshold).label(), Some("Threshold"));
        assert_eq!(filter(Admission::Comparison).label(), Some("Comparison"));
    }

    #[test]
    fn tinylfu_dispatch_uses_recorded_frequency() {
        let mut tinylfu = filter(Admission::TinyLfu);
        let mut stats = PolicyStats::new("test");
        tinylfu.record(1);
        tinylfu.record(1);
        tinylfu.record(2);
        assert!(tinylfu.admit(1, 2, &mut stats));
        assert!(!tinylfu.admit(2, 1, &mut stats));
        assert_eq!(stats.admissions(), 1);
        assert_eq!(stats.rejections(), 1);
    }
}
