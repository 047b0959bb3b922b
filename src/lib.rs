//! cachesim: cache replacement policies and frequency sketches for trace
//! simulation.
//!
//! Policies consume a stream of [`AccessEvent`](traits::AccessEvent)s, decide
//! hits, misses and evictions under a weighted capacity, and count the
//! outcome in [`PolicyStats`](metrics::PolicyStats). Admission filters such as
//! TinyLFU sit beside a policy and veto evictions using a
//! [`FrequencySketch`](sketch::FrequencySketch).
//!
//! ```text
//!   trace ──► Policy::record ──► hit / miss ──► victim? ──► Admittor::admit_weighted
//!                 │                                              │
//!                 └──────────── Admittor::record_access ─────────┴──► FrequencySketch
//! ```

pub mod admission;
pub mod builder;
pub mod config;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod sketch;
pub mod traits;
