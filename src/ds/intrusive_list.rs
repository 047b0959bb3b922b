//! Intrusive doubly linked list backed by `SlotArena`.
//!
//! Nodes live in a [`SlotArena`] and link to each other by [`SlotId`], giving
//! stable handles and O(1) unlink/move without reference cycles. Each node
//! carries a `stamp` (a simulation tick) next to its value: the recency ring
//! of the adaptive policy stamps the last access, the ghost histories stamp
//! the eviction.
//!
//! ```text
//!   front (oldest)                              back (newest)
//!     [id_4 | t=3] ◄──► [id_1 | t=7] ◄──► [id_9 | t=12]
//! ```
//!
//! ## Operations
//!
//! | Method          | Complexity | Description                       |
//! |-----------------|------------|-----------------------------------|
//! | `push_back`     | O(1)       | Append as newest                  |
//! | `pop_front`     | O(1)       | Detach oldest                     |
//! | `move_to_back`  | O(1)       | Re-stamp and make newest          |
//! | `remove`        | O(1)       | Detach by handle                  |
//! | `iter`          | O(n)       | Oldest to newest                  |

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::{InvariantError, ensure_invariant};

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    stamp: u64,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Doubly linked list of stamped values ordered oldest (front) to newest (back).
#[derive(Debug, Clone)]
pub struct IntrusiveList<T> {
    arena: SlotArena<Node<T>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<T> IntrusiveList<T> {
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            head: None,
            tail: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    /// Handle of the oldest node.
    pub fn front_id(&self) -> Option<SlotId> {
        self.head
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|node| &node.value)
    }

    pub fn stamp(&self, id: SlotId) -> Option<u64> {
        self.arena.get(id).map(|node| node.stamp)
    }

    /// Appends `value` as the newest node.
    pub fn push_back(&mut self, value: T, stamp: u64) -> SlotId {
        let id = self.arena.insert(Node {
            value,
            stamp,
            prev: None,
            next: None,
        });
        self.attach_back(id);
        id
    }

    /// Detaches the oldest node, returning its value and stamp.
    pub fn pop_front(&mut self) -> Option<(T, u64)> {
        let id = self.head?;
        self.detach(id);
        self.arena.remove(id).map(|node| (node.value, node.stamp))
    }

    /// Detaches the node at `id`.
    pub fn remove(&mut self, id: SlotId) -> Option<(T, u64)> {
        if !self.arena.contains(id) {
            return None;
        }
        self.detach(id);
        self.arena.remove(id).map(|node| (node.value, node.stamp))
    }

    /// Makes `id` the newest node and replaces its stamp.
    pub fn move_to_back(&mut self, id: SlotId, stamp: u64) {
        self.arena[id].stamp = stamp;
        if self.tail == Some(id) {
            return;
        }
        self.detach(id);
        self.attach_back(id);
    }

    /// Iterates `(id, value, stamp)` from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T, u64)> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let id = cursor?;
            let node = &self.arena[id];
            cursor = node.next;
            Some((id, &node.value, node.stamp))
        })
    }

    fn attach_back(&mut self, id: SlotId) {
        let old_tail = self.tail;
        {
            let node = &mut self.arena[id];
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.arena[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    fn detach(&mut self, id: SlotId) {
        let (prev, next) = {
            let node = &self.arena[id];
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.arena[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.arena[next].prev = prev,
            None => self.tail = prev,
        }
        let node = &mut self.arena[id];
        node.prev = None;
        node.next = None;
    }

    /// Walks the links in both directions and compares against the arena.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut forward = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| InvariantError::new(format!("list links vacant slot {}", id.index())))?;
            ensure_invariant!(node.prev == prev, "broken back link at slot {}", id.index());
            forward += 1;
            ensure_invariant!(forward <= self.arena.len(), "list contains a cycle");
            prev = Some(id);
            cursor = node.next;
        }
        ensure_invariant!(prev == self.tail, "tail does not end the forward walk");
        ensure_invariant!(
            forward == self.arena.len(),
            "list links {} nodes but arena holds {}",
            forward,
            self.arena.len()
        );
        Ok(())
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}
