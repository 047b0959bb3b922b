//! # Statistics Recorder
//!
//! The sink every policy reports into. One access produces exactly one
//! `record_operation` plus one hit or miss (weighted or not); eviction rounds
//! and admission decisions are reported as they happen.
//!
//! ```text
//!   Policy::record ──► record_operation
//!        │
//!        ├─ hit  ──► record_weighted_hit(w)
//!        └─ miss ──► record_weighted_miss(w)
//!                      │
//!                      └─ per eviction round ──► record_eviction
//!                                 │
//!                                 └─ Admittor ──► record_admission | record_rejection
//! ```
//!
//! The weighted variants count the access *and* accumulate its weight, so a
//! policy calls either `record_hit` or `record_weighted_hit`, never both.

/// Counters every simulated policy reports.
pub trait StatsRecorder {
    fn record_operation(&mut self);
    /// Adds `count` operations at once (sampling work, for example).
    fn add_operations(&mut self, count: u64);
    fn record_hit(&mut self);
    fn record_miss(&mut self);
    fn record_weighted_hit(&mut self, weight: u32);
    fn record_weighted_miss(&mut self, weight: u32);
    fn record_eviction(&mut self);
    fn record_admission(&mut self);
    fn record_rejection(&mut self);
}
