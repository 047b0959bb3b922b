pub mod frequency_ring;
pub mod ghost_history;
pub mod intrusive_list;
pub mod lazy_heap;
pub mod slot_arena;

pub use frequency_ring::FrequencyRing;
pub use ghost_history::GhostHistory;
pub use intrusive_list::IntrusiveList;
pub use lazy_heap::LazyMinHeap;
pub use slot_arena::{SlotArena, SlotId};
