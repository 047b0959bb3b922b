//! Workload generators for simulator benchmarks.
//!
//! Deterministic access traces from a seeded `SmallRng`, with optional
//! per-key weights so cost-aware admission has something to compare.

use cachesim::traits::AccessEvent;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Zipf};

#[derive(Debug, Clone, Copy)]
pub enum Workload {
    /// Uniform random keys in `[0, universe)`.
    Uniform,
    /// Hot/cold split with a configurable hot fraction and hot access probability.
    Hotset { hot_fraction: f64, hot_prob: f64 },
    /// Sequential scan in `[0, universe)`.
    Scan,
    /// Zipfian keys; `exponent` 1.0 is the classic skew.
    Zipfian { exponent: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct WorkloadSpec {
    pub universe: u64,
    pub workload: Workload,
    pub seed: u64,
    /// Largest weight handed out; 1 means unit weights.
    pub max_weight: u32,
}

impl WorkloadSpec {
    pub fn generator(self) -> WorkloadGenerator {
        WorkloadGenerator::new(self)
    }

    /// Materializes `len` events.
    pub fn trace(self, len: usize) -> Vec<AccessEvent> {
        let mut generator = self.generator();
        (0..len).map(|_| generator.next_event()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    spec: WorkloadSpec,
    rng: SmallRng,
    scan_pos: u64,
    zipf: Option<Zipf<f64>>,
}

impl WorkloadGenerator {
    pub fn new(spec: WorkloadSpec) -> Self {
        let universe = spec.universe.max(1);
        let zipf = match spec.workload {
            Workload::Zipfian { exponent } => Zipf::new(universe as f64, exponent).ok(),
            _ => None,
        };
        Self {
            spec: WorkloadSpec { universe, ..spec },
            rng: SmallRng::seed_from_u64(spec.seed),
            scan_pos: 0,
            zipf,
        }
    }

    pub fn next_key(&mut self) -> u64 {
        let universe = self.spec.universe;
        match self.spec.workload {
            Workload::Uniform => self.rng.random_range(0..universe),
            Workload::Hotset {
                hot_fraction,
                hot_prob,
            } => {
                let hot_size = ((universe as f64) * hot_fraction.clamp(0.0, 1.0)).round() as u64;
                let hot_size = hot_size.clamp(1, universe);
                if self.rng.random::<f64>() < hot_prob || hot_size == universe {
                    self.rng.random_range(0..hot_size)
                } else {
                    self.rng.random_range(hot_size..universe)
                }
            },
            Workload::Scan => {
                let key = self.scan_pos;
                self.scan_pos = (self.scan_pos + 1) % universe;
                key
            },
            Workload::Zipfian { .. } => match &self.zipf {
                Some(zipf) => zipf.sample(&mut self.rng) as u64 - 1,
                None => self.rng.random_range(0..universe),
            },
        }
    }

    /// Next key with a weight derived from the key, so repeats agree.
    pub fn next_event(&mut self) -> AccessEvent {
        let key = self.next_key();
        let max_weight = u64::from(self.spec.max_weight.max(1));
        let weight = 1 + (key.wrapping_mul(0x9e37_79b9_7f4a_7c15) >> 33) % max_weight;
        AccessEvent::weighted(key, weight as u32)
    }
}
