//! Count-Min sketch with full-width counters.
//!
//! Four rows of `u64` counters; the estimate is the row minimum. Counters are
//! wide enough never to saturate in practice, so aging is the only thing that
//! keeps them small: every `period` additions all counters are halved.

use crate::sketch::{Frequency, spread};

const ROWS: usize = 4;

const SEEDS: [u64; ROWS] = [
    0x97cb_3127_c3a5_c85c,
    0xbe98_f273_b492_b66f,
    0x2f90_404f_9ae1_6a3b,
    0x8422_2325_cbf2_9ce4,
];

#[derive(Debug, Clone)]
pub struct CountMin64 {
    table: Vec<u64>,
    width: usize,
    additions: u64,
    period: u64,
}

impl CountMin64 {
    pub fn new(maximum_size: u64, period: u64) -> Self {
        let width = usize::try_from(maximum_size)
            .unwrap_or(usize::MAX / ROWS)
            .max(16)
            .next_power_of_two();
        Self {
            table: vec![0; width * ROWS],
            width,
            additions: 0,
            period: period.max(1),
        }
    }

    #[inline]
    fn index(&self, hash: u64, row: usize) -> usize {
        let mut h = (hash ^ SEEDS[row]).wrapping_mul(SEEDS[row]);
        h ^= h >> 29;
        row * self.width + (h as usize & (self.width - 1))
    }
}

impl Frequency for CountMin64 {
    fn increment(&mut self, key: u64) {
        if self.additions >= self.period {
            self.reset();
        }
        let hash = spread(key);
        for row in 0..ROWS {
            let index = self.index(hash, row);
            self.table[index] = self.table[index].saturating_add(1);
        }
        self.additions += 1;
    }

    fn estimate(&self, key: u64) -> u64 {
        let hash = spread(key);
        (0..ROWS)
            .map(|row| self.table[self.index(hash, row)])
            .min()
            .unwrap_or(0)
    }

    fn reset(&mut self) {
        for counter in &mut self.table {
            *counter >>= 1;
        }
        self.additions /= 2;
        log::trace!("count-min-64 aged");
    }

    fn max_count(&self) -> u64 {
        u64::MAX
    }
}
