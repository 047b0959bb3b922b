//! Set-associative fingerprint counter table.
//!
//! Each key hashes to one set of [`SLOTS_PER_SET`] slots and is identified
//! inside the set by a 16-bit fingerprint. A slot holds the fingerprint and a
//! 6-bit counter. A key that finds no slot takes a free one, or overwrites a
//! random slot when the set is full. Counters are halved every `period`
//! additions; slots that drop to zero become free.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::sketch::{Frequency, spread};

pub const SLOTS_PER_SET: usize = 8;
const MAX_COUNTER: u8 = 63;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Slot {
    /// Zero marks a free slot.
    fingerprint: u16,
    count: u8,
}

#[derive(Debug, Clone)]
pub struct TinyTable {
    sets: Vec<[Slot; SLOTS_PER_SET]>,
    set_mask: usize,
    additions: u64,
    period: u64,
    rng: SmallRng,
}

impl TinyTable {
    pub fn new(maximum_size: u64, period: u64, seed: u64) -> Self {
        let sets = usize::try_from(maximum_size / 4)
            .unwrap_or(usize::MAX / SLOTS_PER_SET)
            .max(16)
            .next_power_of_two();
        Self {
            sets: vec![[Slot::default(); SLOTS_PER_SET]; sets],
            set_mask: sets - 1,
            additions: 0,
            period: period.max(1),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    #[inline]
    fn locate(&self, key: u64) -> (usize, u16) {
        let hash = spread(key);
        let set = hash as usize & self.set_mask;
        let fingerprint = ((hash >> 48) as u16) | 1;
        (set, fingerprint)
    }
}

impl Frequency for TinyTable {
    fn increment(&mut self, key: u64) {
        if self.additions >= self.period {
            self.reset();
        }
        let (set, fingerprint) = self.locate(key);
        let slots = &mut self.sets[set];

        if let Some(slot) = slots.iter_mut().find(|s| s.fingerprint == fingerprint) {
            slot.count = (slot.count + 1).min(MAX_COUNTER);
        } else {
            let index = match slots.iter().position(|s| s.fingerprint == 0) {
                Some(free) => free,
                None => self.rng.random_range(0..SLOTS_PER_SET),
            };
            slots[index] = Slot {
                fingerprint,
                count: 1,
            };
        }
        self.additions += 1;
    }

    fn estimate(&self, key: u64) -> u64 {
        let (set, fingerprint) = self.locate(key);
        self.sets[set]
            .iter()
            .find(|s| s.fingerprint == fingerprint)
            .map_or(0, |s| u64::from(s.count))
    }

    fn reset(&mut self) {
        for slot in self.sets.iter_mut().flatten() {
            slot.count >>= 1;
            if slot.count == 0 {
                *slot = Slot::default();
            }
        }
        self.additions /= 2;
        log::trace!("tiny table aged");
    }

    fn max_count(&self) -> u64 {
        u64::from(MAX_COUNTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_saturates() {
        let mut table = TinyTable::new(64, 10_000, 1);
        for _ in 0..10 {
            table.increment(4);
        }
        assert_eq!(table.estimate(4), 10);
        for _ in 0..100 {
            table.increment(4);
        }
        assert_eq!(table.estimate(4), u64::from(MAX_COUNTER));
    }

    #[test]
    fn full_set_replaces_a_slot() {
        let mut table = TinyTable::new(64, 10_000, 1);
        for key in 0..10_000u64 {
            table.increment(key);
        }
        let occupied = table.sets.iter().flatten().filter(|s| s.fingerprint != 0).count();
        assert_eq!(occupied, table.sets.len() * SLOTS_PER_SET);
    }

    #[test]
    fn aging_frees_singletons() {
        let mut table = TinyTable::new(64, 4, 1);
        table.increment(1);
        table.increment(2);
        table.increment(2);
        table.increment(2);
        table.increment(3);
        assert_eq!(table.estimate(1), 0);
        assert_eq!(table.estimate(2), 1);
    }
}
