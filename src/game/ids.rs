//! Entity Id Allocation
//!
//! Ids are dense 16-bit integers, allocated monotonically. Freed ids go
//! into a FIFO queue but are only handed out again once the monotonic
//! counter is exhausted, so a recycled id has the longest possible gap
//! since a client last saw it.

use std::collections::VecDeque;

use crate::protocol::EntityId;

/// Allocates entity ids. Id 0 is reserved as "unassigned".
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u16,
    free: VecDeque<u16>,
}

impl IdAllocator {
    /// Create an allocator with the full id space available.
    pub fn new() -> Self {
        Self {
            next: 1,
            free: VecDeque::new(),
        }
    }

    /// Allocate an id. Returns `None` when the id space is exhausted
    /// and nothing has been freed.
    pub fn alloc(&mut self) -> Option<EntityId> {
        if self.next != 0 {
            let id = self.next;
            self.next = self.next.wrapping_add(1);
            return Some(EntityId(id));
        }
        self.free.pop_front().map(EntityId)
    }

    /// Return an id to the recycle queue.
    pub fn free(&mut self, id: EntityId) {
        debug_assert_ne!(id.0, 0);
        self.free.push_back(id.0);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_and_skip_zero() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.alloc(), Some(EntityId(1)));
        assert_eq!(ids.alloc(), Some(EntityId(2)));
        assert_eq!(ids.alloc(), Some(EntityId(3)));
    }

    #[test]
    fn test_freed_ids_not_reused_while_fresh_ids_remain() {
        let mut ids = IdAllocator::new();
        let a = ids.alloc().unwrap();
        ids.free(a);
        assert_eq!(ids.alloc(), Some(EntityId(2)));
    }

    #[test]
    fn test_recycles_in_fifo_order_after_exhaustion() {
        let mut ids = IdAllocator::new();
        // Burn the entire fresh range.
        while ids.alloc().is_some() {}
        assert_eq!(ids.alloc(), None);

        ids.free(EntityId(300));
        ids.free(EntityId(7));
        assert_eq!(ids.alloc(), Some(EntityId(300)));
        assert_eq!(ids.alloc(), Some(EntityId(7)));
        assert_eq!(ids.alloc(), None);
    }
}
