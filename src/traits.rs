//! # Simulator Trait Surface
//!
//! Two seams carry everything the engine does:
//!
//! ```text
//!        AccessEvent { key, weight }
//!                 │
//!                 ▼
//!   ┌──────────────────────────────┐       ┌────────────────────────────────┐
//!   │           Policy             │──────►│           Admittor             │
//!   │                              │       │                                │
//!   │  record(event) → outcome     │       │  record(key) / record_by       │
//!   │  finished()   (audit)        │       │  admit(candidate, victim)      │
//!   │  stats() → &PolicyStats      │       │  admit_weighted(..)            │
//!   └──────────────┬───────────────┘       └───────────────┬────────────────┘
//!                  │                                       │
//!                  └──────────────► StatsRecorder ◄────────┘
//! ```
//!
//! A policy owns its admittor and its [`PolicyStats`]; the stats sink is
//! lent to the admittor for each decision so both report into one place.
//!
//! Policies process events strictly one at a time. Each implementation owns
//! its random generator, so two instances built from the same configuration
//! and fed the same trace produce identical outcomes.

use crate::error::InvariantError;
use crate::metrics::{PolicyStats, StatsRecorder};

/// One trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessEvent {
    pub key: u64,
    /// Cost of the entry in capacity units.
    pub weight: u32,
}

impl AccessEvent {
    /// Access with the default weight of 1.
    pub const fn new(key: u64) -> Self {
        Self { key, weight: 1 }
    }

    pub const fn weighted(key: u64, weight: u32) -> Self {
        Self { key, weight }
    }
}

impl From<u64> for AccessEvent {
    fn from(key: u64) -> Self {
        Self::new(key)
    }
}

/// Result of a single access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessOutcome {
    Hit,
    Miss,
}

impl AccessOutcome {
    pub fn is_hit(self) -> bool {
        self == AccessOutcome::Hit
    }
}

/// A simulated replacement policy.
pub trait Policy {
    /// Label the statistics are reported under.
    fn name(&self) -> &str {
        self.stats().name()
    }

    /// Processes one access.
    fn record(&mut self, event: AccessEvent) -> AccessOutcome;

    fn stats(&self) -> &PolicyStats;

    /// Whether `key` is currently resident.
    fn contains(&self, key: u64) -> bool;

    /// Number of resident entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of resident weights.
    fn weighted_size(&self) -> u64;

    fn maximum_size(&self) -> u64;

    /// Compares bookkeeping against the linked structures.
    fn check_invariants(&self) -> Result<(), InvariantError>;

    /// End-of-trace hook: audits invariants and logs a summary.
    ///
    /// # Panics
    ///
    /// Panics when an invariant is violated; that is an implementation bug.
    fn finished(&mut self) {
        if let Err(err) = self.check_invariants() {
            panic!("{}: invariant violated: {}", self.name(), err);
        }
        log::debug!("{}", self.stats());
    }
}

/// Admission filter consulted when a policy must make room.
pub trait Admittor {
    /// Records one access to `key`.
    fn record(&mut self, key: u64);

    /// Records `amount` accesses to `key`.
    fn record_by(&mut self, key: u64, amount: u32) {
        for _ in 0..amount {
            self.record(key);
        }
    }

    /// Records an access of the given weight. Filters that scale their
    /// increment by cost override this.
    fn record_access(&mut self, key: u64, _weight: u32) {
        self.record(key);
    }

    /// Whether `candidate` should replace `victim`.
    fn admit(&mut self, candidate: u64, victim: u64, stats: &mut dyn StatsRecorder) -> bool;

    /// Whether `candidate` should replace `victim`, given both weights.
    fn admit_weighted(
        &mut self,
        candidate: u64,
        candidate_weight: u32,
        victim: u64,
        victim_weight: u32,
        stats: &mut dyn StatsRecorder,
    ) -> bool;
}
