//! 4-bit Count-Min sketch with pluggable aging.
//!
//! The table is split into four rows; each `u64` word packs 16 saturating
//! 4-bit counters. A key maps to one counter per row and its estimate is the
//! minimum of the four (the Count-Min estimator: it may over-count, never
//! under-count, until aging).
//!
//! ```text
//!   row 0: [w0][w1]...[wN]    key ──► (row r, word, nibble) for r in 0..4
//!   row 1: [w0][w1]...[wN]    estimate = min(counter_0, .., counter_3)
//!   row 2: [w0][w1]...[wN]
//!   row 3: [w0][w1]...[wN]    each word: 16 × 4-bit counters, saturating at 15
//! ```
//!
//! ## Aging strategies
//!
//! | Strategy      | When                                      | What               |
//! |---------------|-------------------------------------------|--------------------|
//! | `Periodic`    | additions reach `period`                  | halve every word   |
//! | `Incremental` | every `interval` increments               | halve one word     |
//! | `Climber`     | like periodic, `period` hill-climbs       | halve every word   |
//! | `Indicator`   | a row collects enough saturation events   | halve that row     |
//!
//! Halving shifts every nibble right by one; [`RESET_MASK`] clears the bit
//! that would otherwise spill into the neighbouring nibble.

use crate::config::{ResetStrategy, SimulatorConfig};
use crate::sketch::{Frequency, spread};

const ROWS: usize = 4;

const SEEDS: [u64; ROWS] = [
    0xc3a5_c85c_97cb_3127,
    0xb492_b66f_be98_f273,
    0x9ae1_6a3b_2f90_404f,
    0xcbf2_9ce4_8422_2325,
];

const RESET_MASK: u64 = 0x7777_7777_7777_7777;
const ONE_MASK: u64 = 0x1111_1111_1111_1111;
const MAX_COUNTER: u64 = 15;

/// Hill-climbing step as a fraction of the base period (1/16).
const CLIMB_STEP_SHIFT: u32 = 4;

#[derive(Debug, Clone)]
enum Aging {
    Periodic,
    Incremental {
        interval: u64,
        ticks: u64,
        cursor: usize,
    },
    Climber(PeriodClimber),
    Indicator {
        saturation: [u64; ROWS],
        threshold: u64,
    },
}

/// Moves the reset period toward whatever improved the sampled hit rate.
#[derive(Debug, Clone)]
struct PeriodClimber {
    base: u64,
    step: u64,
    growing: bool,
    sample_events: u64,
    sample_misses: u64,
    previous_hit_rate: Option<f64>,
}

impl PeriodClimber {
    fn new(base: u64) -> Self {
        Self {
            base,
            step: (base >> CLIMB_STEP_SHIFT).max(1),
            growing: true,
            sample_events: 0,
            sample_misses: 0,
            previous_hit_rate: None,
        }
    }

    /// Returns the adjusted period once a full sample has been observed.
    fn observe(&mut self, period: u64) -> Option<u64> {
        self.sample_events += 1;
        if self.sample_events < self.base {
            return None;
        }
        let misses = self.sample_misses.min(self.sample_events);
        let hit_rate = 1.0 - misses as f64 / self.sample_events as f64;
        if let Some(previous) = self.previous_hit_rate
            && hit_rate < previous
        {
            self.growing = !self.growing;
        }
        self.previous_hit_rate = Some(hit_rate);
        self.sample_events = 0;
        self.sample_misses = 0;

        let min = (self.base / 4).max(1);
        let max = self.base.saturating_mul(4);
        let next = if self.growing {
            period.saturating_add(self.step)
        } else {
            period.saturating_sub(self.step)
        };
        Some(next.clamp(min, max))
    }
}

/// 4-bit Count-Min sketch. See the module docs for the layout.
#[derive(Debug, Clone)]
pub struct CountMin4 {
    table: Vec<u64>,
    row_mask: usize,
    row_words: usize,
    conservative: bool,
    additions: u64,
    period: u64,
    resets: u64,
    aging: Aging,
}

impl CountMin4 {
    /// Creates a periodic sketch sized for `maximum_size` keys.
    pub fn new(maximum_size: u64, period: u64) -> Self {
        Self::with_aging(maximum_size, period, Aging::Periodic, false)
    }

    /// Builds the sketch described by the reset-related configuration fields.
    pub fn from_config(config: &SimulatorConfig) -> Self {
        let period = config.period();
        let words = table_words(config.maximum_size);
        let aging = match config.sketch_reset_strategy {
            ResetStrategy::Periodic => Aging::Periodic,
            ResetStrategy::Incremental => Aging::Incremental {
                interval: config
                    .incremental_interval
                    .unwrap_or(period / words as u64)
                    .max(1),
                ticks: 0,
                cursor: 0,
            },
            ResetStrategy::Climber => Aging::Climber(PeriodClimber::new(period)),
            ResetStrategy::Indicator => Aging::Indicator {
                saturation: [0; ROWS],
                threshold: (words / ROWS) as u64,
            },
        };
        Self::with_aging(config.maximum_size, period, aging, config.conservative)
    }

    fn with_aging(maximum_size: u64, period: u64, aging: Aging, conservative: bool) -> Self {
        let words = table_words(maximum_size);
        let row_words = words / ROWS;
        Self {
            table: vec![0; words],
            row_mask: row_words - 1,
            row_words,
            conservative,
            additions: 0,
            period: period.max(1),
            resets: 0,
            aging,
        }
    }

    /// Number of aging events so far (full or partial).
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Additions that trigger the next full reset.
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Counted additions since the last full reset.
    pub fn additions(&self) -> u64 {
        self.additions
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// `(word index, bit shift)` of the counter for `key` in `row`.
    #[inline]
    fn slot(&self, hash: u64, row: usize) -> (usize, u32) {
        let mut h = (hash ^ SEEDS[row]).wrapping_mul(SEEDS[row]);
        h ^= h >> 32;
        let word = row * self.row_words + (h as usize & self.row_mask);
        let shift = (((h >> 40) & 0xF) as u32) << 2;
        (word, shift)
    }

    #[inline]
    fn counter(&self, word: usize, shift: u32) -> u64 {
        (self.table[word] >> shift) & MAX_COUNTER
    }

    fn halve_all(&mut self) {
        let mut odd = 0u64;
        for word in &mut self.table {
            odd += u64::from((*word & ONE_MASK).count_ones());
            *word = (*word >> 1) & RESET_MASK;
        }
        self.additions = self.additions.saturating_sub(odd >> 2) >> 1;
        self.resets += 1;
        log::trace!("count-min-4 aged (reset #{})", self.resets);
    }

    fn halve_row(&mut self, row: usize) {
        let start = row * self.row_words;
        for word in &mut self.table[start..start + self.row_words] {
            *word = (*word >> 1) & RESET_MASK;
        }
        self.resets += 1;
        log::trace!("count-min-4 row {} aged (reset #{})", row, self.resets);
    }

    /// Full resets are checked before counting the increment that finds the
    /// window full.
    fn age_before_increment(&mut self) {
        if let Aging::Climber(climber) = &mut self.aging
            && let Some(period) = climber.observe(self.period)
        {
            self.period = period;
        }
        if matches!(self.aging, Aging::Periodic | Aging::Climber(_)) && self.additions >= self.period
        {
            self.halve_all();
        }
    }

    fn age_after_increment(&mut self, saturated: [bool; ROWS]) {
        match &mut self.aging {
            Aging::Incremental {
                interval,
                ticks,
                cursor,
            } => {
                *ticks += 1;
                if *ticks % *interval == 0 {
                    let word = &mut self.table[*cursor];
                    *word = (*word >> 1) & RESET_MASK;
                    *cursor = (*cursor + 1) % self.table.len();
                    self.resets += 1;
                }
            },
            Aging::Indicator {
                saturation,
                threshold,
            } => {
                let threshold = (*threshold).max(1);
                let mut full = [false; ROWS];
                for row in 0..ROWS {
                    if saturated[row] {
                        saturation[row] += 1;
                    }
                    if saturation[row] >= threshold {
                        saturation[row] = 0;
                        full[row] = true;
                    }
                }
                for row in (0..ROWS).filter(|&row| full[row]) {
                    self.halve_row(row);
                }
            },
            Aging::Periodic | Aging::Climber(_) => {},
        }
    }
}

impl Frequency for CountMin4 {
    fn increment(&mut self, key: u64) {
        self.age_before_increment();

        let hash = spread(key);
        let slots: [(usize, u32); ROWS] = std::array::from_fn(|row| self.slot(hash, row));
        let values: [u64; ROWS] = std::array::from_fn(|row| {
            let (word, shift) = slots[row];
            self.counter(word, shift)
        });
        let min = values.iter().copied().min().unwrap_or(0);

        let mut added = false;
        let mut saturated = [false; ROWS];
        for row in 0..ROWS {
            if values[row] == MAX_COUNTER {
                saturated[row] = true;
                continue;
            }
            if self.conservative && values[row] != min {
                continue;
            }
            let (word, shift) = slots[row];
            self.table[word] += 1 << shift;
            added = true;
        }
        if added {
            self.additions += 1;
        }

        self.age_after_increment(saturated);
    }

    fn estimate(&self, key: u64) -> u64 {
        let hash = spread(key);
        (0..ROWS)
            .map(|row| {
                let (word, shift) = self.slot(hash, row);
                self.counter(word, shift)
            })
            .min()
            .unwrap_or(0)
    }

    fn reset(&mut self) {
        self.halve_all();
    }

    fn max_count(&self) -> u64 {
        MAX_COUNTER
    }

    fn report_miss(&mut self) {
        if let Aging::Climber(climber) = &mut self.aging {
            climber.sample_misses += 1;
        }
    }
}

/// Power-of-two word count, at least 16 words (4 per row).
fn table_words(maximum_size: u64) -> usize {
    let wanted = usize::try_from(maximum_size).unwrap_or(usize::MAX / 2);
    wanted.max(16).next_power_of_two()
}
