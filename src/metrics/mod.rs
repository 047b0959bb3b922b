//! Policy statistics.
//!
//! Recording is separated from reading: policies and admittors write through
//! the [`StatsRecorder`] trait, callers read a [`PolicyStatsSnapshot`] with the
//! derived ratios.

pub mod policy_stats;
pub mod snapshot;
pub mod traits;

pub use policy_stats::PolicyStats;
pub use snapshot::PolicyStatsSnapshot;
pub use traits::StatsRecorder;
