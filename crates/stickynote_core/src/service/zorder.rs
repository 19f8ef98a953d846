//! Monotonic stacking allocator.
//!
//! # Invariants
//! - Every allocated key is strictly greater than every earlier one.
//! - Keys are never reused or decremented; the counter restarts at its base
//!   on each load.

use crate::model::note::Note;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZOrderAllocator {
    next: u64,
}

impl ZOrderAllocator {
    /// Creates an allocator whose first key is `base`.
    pub fn new(base: u64) -> Self {
        Self { next: base }
    }

    /// Returns the next key and advances the counter.
    pub fn allocate(&mut self) -> u64 {
        let key = self.next;
        self.next = self.next.saturating_add(1);
        key
    }

    /// Puts `note` above every note stacked so far.
    pub fn bring_to_front(&mut self, note: &mut Note) -> u64 {
        note.z_order = self.allocate();
        note.z_order
    }
}

#[cfg(test)]
mod tests {
    use super::ZOrderAllocator;

    #[test]
    fn keys_strictly_increase() {
        let mut allocator = ZOrderAllocator::new(2_147_483_657);
        let a = allocator.allocate();
        let b = allocator.allocate();
        assert_eq!(a, 2_147_483_657);
        assert!(b > a);
        assert_eq!(allocator.allocate(), b + 1);
    }
}
