//! Frequency sketches backing TinyLFU admission.
//!
//! A sketch estimates how often a key was seen recently. Admission compares
//! the estimate of a miss candidate against the estimate of the policy's
//! victim, so the sketch only needs to be roughly right and to forget old
//! popularity over time. Each sketch ages itself: callers only `increment`
//! and `estimate`.
//!
//! | Sketch          | Counters                         | Aging                          |
//! |-----------------|----------------------------------|--------------------------------|
//! | [`CountMin4`]   | 4 rows of 4-bit nibbles          | periodic, incremental, climber, indicator |
//! | [`CountMin64`]  | 4 rows of `u64`                  | periodic halving               |
//! | [`RandomTable`] | exact, per key                   | random decrement once full     |
//! | [`TinyTable`]   | fingerprint + 6-bit count slots  | periodic halving               |
//! | [`PerfectTable`]| exact, per key                   | periodic halving               |
//!
//! [`FrequencySketch`] is the closed set of sketches selectable from a
//! [`SimulatorConfig`]; it is chosen once at construction.

pub mod count_min4;
pub mod count_min64;
pub mod perfect;
pub mod random_table;
pub mod tiny_table;

pub use count_min4::CountMin4;
pub use count_min64::CountMin64;
pub use perfect::PerfectTable;
pub use random_table::RandomTable;
pub use tiny_table::TinyTable;

use crate::config::{SimulatorConfig, SketchType};
use crate::error::ConfigError;

/// Approximate, self-aging access counter.
pub trait Frequency {
    /// Records one access to `key`.
    fn increment(&mut self, key: u64);

    /// Estimated recent access count of `key`.
    fn estimate(&self, key: u64) -> u64;

    /// Ages the whole table.
    fn reset(&mut self);

    /// Largest value `estimate` can return.
    fn max_count(&self) -> u64;

    /// Notifies the sketch that an admission decision followed a miss.
    fn report_miss(&mut self) {}
}

/// Sketch selected by configuration.
#[derive(Debug, Clone)]
pub enum FrequencySketch {
    CountMin4(CountMin4),
    CountMin64(CountMin64),
    RandomTable(RandomTable),
    TinyTable(TinyTable),
    PerfectTable(PerfectTable),
}

impl FrequencySketch {
    /// Builds the configured sketch sized for `config.maximum_size` keys.
    pub fn from_config(config: &SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let sketch = match config.sketch_type {
            SketchType::CountMin4 => FrequencySketch::CountMin4(CountMin4::from_config(config)),
            SketchType::CountMin64 => FrequencySketch::CountMin64(CountMin64::new(
                config.maximum_size,
                config.period(),
            )),
            SketchType::RandomTable => FrequencySketch::RandomTable(RandomTable::new(
                config.period(),
                config.random_seed,
            )),
            SketchType::TinyTable => FrequencySketch::TinyTable(TinyTable::new(
                config.maximum_size,
                config.period(),
                config.random_seed,
            )),
            SketchType::PerfectTable => {
                FrequencySketch::PerfectTable(PerfectTable::new(config.period()))
            },
        };
        log::debug!(
            "frequency sketch {} for {} entries (period {})",
            config.sketch_type,
            config.maximum_size,
            config.period()
        );
        Ok(sketch)
    }

    /// Configuration name of the active sketch.
    pub fn sketch_type(&self) -> SketchType {
        match self {
            FrequencySketch::CountMin4(_) => SketchType::CountMin4,
            FrequencySketch::CountMin64(_) => SketchType::CountMin64,
            FrequencySketch::RandomTable(_) => SketchType::RandomTable,
            FrequencySketch::TinyTable(_) => SketchType::TinyTable,
            FrequencySketch::PerfectTable(_) => SketchType::PerfectTable,
        }
    }
}

impl Frequency for FrequencySketch {
    fn increment(&mut self, key: u64) {
        match self {
            FrequencySketch::CountMin4(s) => s.increment(key),
            FrequencySketch::CountMin64(s) => s.increment(key),
            FrequencySketch::RandomTable(s) => s.increment(key),
            FrequencySketch::TinyTable(s) => s.increment(key),
            FrequencySketch::PerfectTable(s) => s.increment(key),
        }
    }

    fn estimate(&self, key: u64) -> u64 {
        match self {
            FrequencySketch::CountMin4(s) => s.estimate(key),
            FrequencySketch::CountMin64(s) => s.estimate(key),
            FrequencySketch::RandomTable(s) => s.estimate(key),
            FrequencySketch::TinyTable(s) => s.estimate(key),
            FrequencySketch::PerfectTable(s) => s.estimate(key),
        }
    }

    fn reset(&mut self) {
        match self {
            FrequencySketch::CountMin4(s) => s.reset(),
            FrequencySketch::CountMin64(s) => s.reset(),
            FrequencySketch::RandomTable(s) => s.reset(),
            FrequencySketch::TinyTable(s) => s.reset(),
            FrequencySketch::PerfectTable(s) => s.reset(),
        }
    }

    fn max_count(&self) -> u64 {
        match self {
            FrequencySketch::CountMin4(s) => s.max_count(),
            FrequencySketch::CountMin64(s) => s.max_count(),
            FrequencySketch::RandomTable(s) => s.max_count(),
            FrequencySketch::TinyTable(s) => s.max_count(),
            FrequencySketch::PerfectTable(s) => s.max_count(),
        }
    }

    fn report_miss(&mut self) {
        if let FrequencySketch::CountMin4(s) = self {
            s.report_miss();
        }
    }
}

/// Scrambles a key so that sequential keys land in unrelated slots.
#[inline]
pub(crate) fn spread(key: u64) -> u64 {
    let mut x = key.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResetStrategy;

    fn config(sketch: SketchType) -> SimulatorConfig {
        SimulatorConfig::builder(128)
            .sketch_type(sketch)
            .try_build()
            .unwrap()
    }

    #[test]
    fn from_config_builds_every_sketch() {
        for sketch in SketchType::ALL {
            let built = FrequencySketch::from_config(&config(*sketch)).unwrap();
            assert_eq!(built.sketch_type(), *sketch);
        }
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let mut bad = config(SketchType::CountMin4);
        bad.maximum_size = 0;
        assert!(FrequencySketch::from_config(&bad).is_err());
    }

    #[test]
    fn every_sketch_counts_repeated_keys() {
        for sketch in SketchType::ALL {
            let mut built = FrequencySketch::from_config(&config(*sketch)).unwrap();
            for _ in 0..5 {
                built.increment(7);
            }
            built.increment(8);
            assert!(built.estimate(7) >= 5, "{sketch} lost counts");
            assert!(built.estimate(7) > built.estimate(9), "{sketch} confused keys");
        }
    }

    #[test]
    fn spread_scatters_sequential_keys() {
        let a = spread(1);
        let b = spread(2);
        assert_ne!(a, b);
        assert!((a ^ b).count_ones() > 8);
    }

    #[test]
    fn reset_strategies_all_build() {
        for reset in ResetStrategy::ALL {
            let config = SimulatorConfig::builder(64)
                .sketch_reset_strategy(*reset)
                .try_build()
                .unwrap();
            assert!(FrequencySketch::from_config(&config).is_ok());
        }
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::config::ResetStrategy;
    use proptest::prelude::*;

    // =============================================================================
    // Property Tests - Boundedness
    // =============================================================================

    proptest! {
        /// Property: estimates never exceed the sketch's representable maximum
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_estimates_are_bounded(
            sketch_idx in 0usize..5,
            reset_idx in 0usize..4,
            keys in prop::collection::vec(0u64..64, 0..400)
        ) {
            let config = SimulatorConfig::builder(32)
                .sketch_type(SketchType::ALL[sketch_idx])
                .sketch_reset_strategy(ResetStrategy::ALL[reset_idx])
                .try_build()
                .unwrap();
            let mut sketch = FrequencySketch::from_config(&config).unwrap();
            for key in &keys {
                sketch.increment(*key);
                prop_assert!(sketch.estimate(*key) <= sketch.max_count());
            }
        }

        /// Property: keys that stop being touched decay toward zero
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_untouched_keys_decay(sketch_idx in 0usize..5, hot in 0u64..1_000) {
            let config = SimulatorConfig::builder(32)
                .sketch_type(SketchType::ALL[sketch_idx])
                .reset_period(64)
                .try_build()
                .unwrap();
            let mut sketch = FrequencySketch::from_config(&config).unwrap();
            for _ in 0..12 {
                sketch.increment(hot);
            }
            let before = sketch.estimate(hot);

            for key in 10_000..12_000u64 {
                sketch.increment(key);
            }
            let after = sketch.estimate(hot);
            prop_assert!(after < before, "estimate {} did not decay from {}", after, before);
        }
    }
}
