pub use crate::admission::{AdmissionFilter, TieBreak, TinyLfu};
pub use crate::builder::{PolicyBuilder, PolicyKind, SimulatedPolicy, replay};
pub use crate::config::{
    Admission, EvictionRule, LearningRateMode, ResetStrategy, SampleStrategy, SimulatorConfig,
    SketchType,
};
pub use crate::ds::{FrequencyRing, GhostHistory, IntrusiveList, LazyMinHeap, SlotArena, SlotId};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::metrics::{PolicyStats, PolicyStatsSnapshot, StatsRecorder};
pub use crate::policy::adaptive::{AdaptiveHybridPolicy, SubPolicy, Weights};
pub use crate::policy::frequent::{FrequencyOrder, FrequentlyUsedPolicy};
pub use crate::policy::heap::{AgingPolicy, LfuHeapPolicy};
pub use crate::policy::sampled::SampledPolicy;
pub use crate::sketch::{Frequency, FrequencySketch};
pub use crate::traits::{AccessEvent, AccessOutcome, Admittor, Policy};
