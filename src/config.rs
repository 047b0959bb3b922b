//! Simulator configuration.
//!
//! Every configuration axis is a closed enum that parses from its canonical
//! name. Names are matched case-insensitively and separators (`-`, `_`) are
//! ignored, so `count-min-4`, `CountMin4` and `count_min4` are the same
//! sketch. Unknown names are a [`ConfigError`]; nothing silently falls back to
//! a default.
//!
//! ## Fields
//!
//! | Field                   | Default         | Used by                         |
//! |-------------------------|-----------------|---------------------------------|
//! | `maximum_size`          | (required)      | every policy                    |
//! | `random_seed`           | `0x4d59_6f6f`   | samplers, sub-policy draws      |
//! | `sample_strategy`       | `guess`         | sampled policies                |
//! | `sample_size`           | `8`             | sampled policies                |
//! | `sketch_type`           | `count-min-4`   | sketch-backed admittors         |
//! | `sketch_reset_strategy` | `periodic`      | `count-min-4`                   |
//! | `eviction_rule`         | `lru`           | sampled policies                |
//! | `learning_rate`         | `0.3`           | adaptive policy                 |
//! | `is_cost_aware`         | `false`         | admission tie-break, threshold  |
//! | `admission`             | `tinylfu`       | frequency and sampled policies  |
//! | `reset_period`          | `10 * max`      | sketch aging                    |
//! | `incremental_interval`  | derived         | `incremental` reset             |
//! | `conservative`          | `false`         | `count-min-4` updates           |
//! | `learning_rate_mode`    | `fixed`         | adaptive policy                 |
//!
//! ## Example
//!
//! ```
//! use cachesim::config::{EvictionRule, SampleStrategy, SimulatorConfig};
//!
//! let config = SimulatorConfig::builder(1_000)
//!     .sample_strategy("reservoir".parse().unwrap())
//!     .eviction_rule(EvictionRule::Hyperbolic)
//!     .sample_size(16)
//!     .try_build()
//!     .unwrap();
//!
//! assert_eq!(config.sample_strategy, SampleStrategy::Reservoir);
//! assert_eq!(config.period(), 10_000);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! config_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $axis:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical configuration name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize(s);
                $name::ALL
                    .iter()
                    .copied()
                    .find(|variant| normalize(variant.as_str()) == wanted)
                    .ok_or_else(|| ConfigError::new(format!("unknown {}: {}", $axis, s)))
            }
        }
    };
}

config_enum! {
    /// How a sampled policy draws eviction candidates.
    SampleStrategy, "sample strategy" {
        /// Random indices, retried when they hit the candidate or repeat.
        Guess => "guess",
        /// One reservoir pass over the live table.
        Reservoir => "reservoir",
        /// Shuffle the live table and take a prefix.
        Shuffle => "shuffle",
    }
}

config_enum! {
    /// Frequency sketch backing TinyLFU admission.
    SketchType, "sketch type" {
        CountMin4 => "count-min-4",
        CountMin64 => "count-min-64",
        RandomTable => "random-table",
        TinyTable => "tiny-table",
        PerfectTable => "perfect-table",
    }
}

config_enum! {
    /// When and how much of a `count-min-4` sketch is aged.
    ResetStrategy, "reset strategy" {
        Periodic => "periodic",
        Incremental => "incremental",
        Climber => "climber",
        Indicator => "indicator",
    }
}

config_enum! {
    /// Victim selection rule applied to a sample.
    EvictionRule, "eviction rule" {
        Fifo => "fifo",
        Lru => "lru",
        Mru => "mru",
        Lfu => "lfu",
        Mfu => "mfu",
        Random => "random",
        Hyperbolic => "hyperbolic",
    }
}

config_enum! {
    /// Admission filter consulted when a policy has to evict.
    Admission, "admission" {
        Always => "always",
        TinyLfu => "tinylfu",
        TinyLfuBoost => "tinylfu-boost",
        Threshold => "threshold",
        Comparison => "comparison",
    }
}

config_enum! {
    /// Learning-rate schedule of the adaptive policy.
    LearningRateMode, "learning rate mode" {
        Fixed => "fixed",
        Anomaly => "anomaly",
    }
}

impl EvictionRule {
    /// Name used in policy labels, e.g. `Hyperbolic`.
    pub fn label(self) -> &'static str {
        match self {
            EvictionRule::Fifo => "Fifo",
            EvictionRule::Lru => "Lru",
            EvictionRule::Mru => "Mru",
            EvictionRule::Lfu => "Lfu",
            EvictionRule::Mfu => "Mfu",
            EvictionRule::Random => "Random",
            EvictionRule::Hyperbolic => "Hyperbolic",
        }
    }
}

/// Settings read once when a policy is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub maximum_size: u64,
    pub random_seed: u64,
    pub sample_strategy: SampleStrategy,
    pub sample_size: usize,
    pub sketch_type: SketchType,
    pub sketch_reset_strategy: ResetStrategy,
    pub eviction_rule: EvictionRule,
    pub learning_rate: f64,
    pub is_cost_aware: bool,
    pub admission: Admission,
    /// Sketch additions between agings; `None` means `10 * maximum_size`.
    pub reset_period: Option<u64>,
    /// Increments between single-word agings of the `incremental` reset.
    pub incremental_interval: Option<u64>,
    /// Only increment the counters that hold the current minimum.
    pub conservative: bool,
    pub learning_rate_mode: LearningRateMode,
}

impl SimulatorConfig {
    pub const DEFAULT_SEED: u64 = 0x4d59_6f6f;
    pub const DEFAULT_SAMPLE_SIZE: usize = 8;
    pub const DEFAULT_LEARNING_RATE: f64 = 0.3;

    /// Starts a builder with every optional field at its default.
    pub fn builder(maximum_size: u64) -> ConfigBuilder {
        ConfigBuilder {
            config: SimulatorConfig {
                maximum_size,
                random_seed: Self::DEFAULT_SEED,
                sample_strategy: SampleStrategy::Guess,
                sample_size: Self::DEFAULT_SAMPLE_SIZE,
                sketch_type: SketchType::CountMin4,
                sketch_reset_strategy: ResetStrategy::Periodic,
                eviction_rule: EvictionRule::Lru,
                learning_rate: Self::DEFAULT_LEARNING_RATE,
                is_cost_aware: false,
                admission: Admission::TinyLfu,
                reset_period: None,
                incremental_interval: None,
                conservative: false,
                learning_rate_mode: LearningRateMode::Fixed,
            },
        }
    }

    /// Sketch additions between agings.
    pub fn period(&self) -> u64 {
        self.reset_period
            .unwrap_or_else(|| self.maximum_size.saturating_mul(10))
            .max(1)
    }

    /// Checks value ranges; enum axes are already valid by construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.maximum_size == 0 {
            return Err(ConfigError::new("maximum_size must be > 0"));
        }
        if self.sample_size == 0 {
            return Err(ConfigError::new("sample_size must be > 0"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::new(format!(
                "learning_rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }
        if self.reset_period == Some(0) {
            return Err(ConfigError::new("reset_period must be > 0"));
        }
        if self.incremental_interval == Some(0) {
            return Err(ConfigError::new("incremental_interval must be > 0"));
        }
        if self.sample_size as u64 > self.maximum_size {
            log::warn!(
                "sample_size {} exceeds maximum_size {}; samples will cover the whole table",
                self.sample_size,
                self.maximum_size
            );
        }
        Ok(())
    }
}

/// Builder for [`SimulatorConfig`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: SimulatorConfig,
}

impl ConfigBuilder {
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    pub fn sample_strategy(mut self, strategy: SampleStrategy) -> Self {
        self.config.sample_strategy = strategy;
        self
    }

    pub fn sample_size(mut self, size: usize) -> Self {
        self.config.sample_size = size;
        self
    }

    pub fn sketch_type(mut self, sketch: SketchType) -> Self {
        self.config.sketch_type = sketch;
        self
    }

    pub fn sketch_reset_strategy(mut self, strategy: ResetStrategy) -> Self {
        self.config.sketch_reset_strategy = strategy;
        self
    }

    pub fn eviction_rule(mut self, rule: EvictionRule) -> Self {
        self.config.eviction_rule = rule;
        self
    }

    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.config.learning_rate = rate;
        self
    }

    pub fn cost_aware(mut self, cost_aware: bool) -> Self {
        self.config.is_cost_aware = cost_aware;
        self
    }

    pub fn admission(mut self, admission: Admission) -> Self {
        self.config.admission = admission;
        self
    }

    pub fn reset_period(mut self, period: u64) -> Self {
        self.config.reset_period = Some(period);
        self
    }

    pub fn incremental_interval(mut self, interval: u64) -> Self {
        self.config.incremental_interval = Some(interval);
        self
    }

    pub fn conservative(mut self, conservative: bool) -> Self {
        self.config.conservative = conservative;
        self
    }

    pub fn learning_rate_mode(mut self, mode: LearningRateMode) -> Self {
        self.config.learning_rate_mode = mode;
        self
    }

    /// Validates and returns the configuration.
    pub fn try_build(self) -> Result<SimulatorConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
