//! Binary buddy system with per-order free lists.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use super::allocator::{check_request, Allocation, Block, BlockAllocator};
use crate::config::SimConfig;
use crate::error::{Result, SimError};

/// Smallest power of two `>= n` (`1` for `n == 0`).
#[inline]
pub const fn size_class(n: usize) -> usize {
    n.next_power_of_two()
}

/// Binary buddy allocator over a power-of-two arena.
///
/// Order 0 is `min_block_size`; order `k` holds blocks of
/// `min_block_size << k`, up to the whole arena at `max_order`. Each order
/// keeps its free offsets sorted so the lowest-addressed block is reused
/// first and a split-then-merge sequence leaves the lists exactly as it
/// found them.
#[derive(Debug, Clone)]
pub struct BuddySystemAllocator {
    capacity: usize,
    min_block_size: usize,
    max_order: usize,
    free_lists: Vec<BTreeSet<usize>>,
    // offset -> order of every live allocation
    live: BTreeMap<usize, usize>,
    waste: usize,
}

impl BuddySystemAllocator {
    /// Creates an allocator whose whole arena is one free top-order block.
    ///
    /// # Errors
    /// `InvalidParameter` unless both sizes are powers of two and
    /// `min_block_size <= capacity`.
    pub fn new(capacity: usize, min_block_size: usize) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(SimError::invalid("arena_capacity", capacity));
        }
        if !min_block_size.is_power_of_two() || min_block_size > capacity {
            return Err(SimError::invalid("min_block_size", min_block_size));
        }

        let max_order = (capacity.trailing_zeros() - min_block_size.trailing_zeros()) as usize;
        let mut free_lists = vec![BTreeSet::new(); max_order + 1];
        free_lists[max_order].insert(0);

        Ok(Self { capacity, min_block_size, max_order, free_lists, live: BTreeMap::new(), waste: 0 })
    }

    /// Builds an allocator from the arena capacity and minimum block of `config`.
    ///
    /// # Errors
    /// See [`BuddySystemAllocator::new`].
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        Self::new(config.arena_capacity, config.min_block_size)
    }

    /// Highest order; its single block spans the arena.
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Block size of `order`.
    #[inline]
    pub fn block_size(&self, order: usize) -> usize {
        self.min_block_size << order
    }

    /// Order whose blocks are the smallest that can hold `size` bytes.
    pub fn order_for(&self, size: usize) -> usize {
        let block = size_class(size).max(self.min_block_size);
        (block.trailing_zeros() - self.min_block_size.trailing_zeros()) as usize
    }

    /// Free offsets of `order` in ascending order; empty for an unknown order.
    pub fn free_list(&self, order: usize) -> Vec<usize> {
        self.free_lists.get(order).map(|l| l.iter().copied().collect()).unwrap_or_default()
    }

    /// Frees everything and clears the waste counter.
    pub fn reset(&mut self) {
        for list in &mut self.free_lists {
            list.clear();
        }
        self.free_lists[self.max_order].insert(0);
        self.live.clear();
        self.waste = 0;
    }
}

impl BlockAllocator for BuddySystemAllocator {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn allocate(&mut self, size: usize) -> Result<Allocation> {
        check_request(size, self.capacity)?;
        let order = self.order_for(size);

        let found = (order..=self.max_order)
            .find(|&o| !self.free_lists[o].is_empty())
            .ok_or(SimError::OutOfMemory { requested: size })?;
        let offset = self.free_lists[found]
            .pop_first()
            .ok_or(SimError::OutOfMemory { requested: size })?;

        // Keep the lower half, release the upper half one order down.
        let mut current = found;
        while current > order {
            current -= 1;
            let buddy = offset + self.block_size(current);
            self.free_lists[current].insert(buddy);
            trace!(offset, buddy, order = current, "buddy split");
        }

        let granted = self.block_size(order);
        let waste = granted - size;
        self.live.insert(offset, order);
        self.waste += waste;

        debug!(offset, size, granted, waste, "buddy allocate");
        Ok(Allocation { offset, requested: size, granted, waste })
    }

    fn free(&mut self, offset: usize) -> Result<()> {
        let mut order = self.live.remove(&offset).ok_or_else(|| SimError::offset_not_found(offset))?;
        let mut offset = offset;

        while order < self.max_order {
            let buddy = offset ^ self.block_size(order);
            if !self.free_lists[order].remove(&buddy) {
                break;
            }
            trace!(offset, buddy, order, "buddy merge");
            offset &= buddy;
            order += 1;
        }
        self.free_lists[order].insert(offset);

        debug!(offset, order, "buddy free");
        Ok(())
    }

    fn blocks(&self) -> Vec<Block> {
        let free = self.free_lists.iter().enumerate().flat_map(|(order, list)| {
            list.iter().map(move |&offset| Block::free(offset, self.min_block_size << order))
        });
        let live = self.live.iter().map(|(&offset, &order)| Block::occupied(offset, self.block_size(order)));

        let mut blocks: Vec<Block> = free.chain(live).collect();
        blocks.sort_unstable_by_key(|b| b.offset);
        blocks
    }

    fn total_waste(&self) -> usize {
        self.waste
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_rounds_up() {
        assert_eq!(size_class(1), 1);
        assert_eq!(size_class(5), 8);
        assert_eq!(size_class(16), 16);
        assert_eq!(size_class(17), 32);
    }

    #[test]
    fn rejects_non_power_of_two_arena() {
        assert!(matches!(BuddySystemAllocator::new(48, 1), Err(SimError::InvalidParameter { .. })));
        assert!(matches!(BuddySystemAllocator::new(64, 128), Err(SimError::InvalidParameter { .. })));
    }

    #[test]
    fn split_pushes_upper_halves() {
        let mut buddy = BuddySystemAllocator::new(64, 1).unwrap();
        let a = buddy.allocate(10).unwrap();
        assert_eq!((a.offset, a.granted, a.waste), (0, 16, 6));
        assert_eq!(buddy.free_list(buddy.order_for(32)), vec![32]);
        assert_eq!(buddy.free_list(buddy.order_for(16)), vec![16]);
    }

    #[test]
    fn free_merges_back_to_the_root() {
        let mut buddy = BuddySystemAllocator::new(64, 1).unwrap();
        let a = buddy.allocate(10).unwrap();
        let b = buddy.allocate(5).unwrap();
        buddy.free(a.offset).unwrap();
        buddy.free(b.offset).unwrap();
        assert_eq!(buddy.blocks(), vec![Block::free(0, 64)]);
        assert_eq!(buddy.total_waste(), 9);
    }

    #[test]
    fn minimum_block_clamps_small_requests() {
        let mut buddy = BuddySystemAllocator::new(256, 16).unwrap();
        let a = buddy.allocate(3).unwrap();
        assert_eq!(a.granted, 16);
        assert_eq!(a.waste, 13);
    }

    #[test]
    fn exhaustion_and_unknown_offsets() {
        let mut buddy = BuddySystemAllocator::new(32, 1).unwrap();
        buddy.allocate(32).unwrap();
        assert!(matches!(buddy.allocate(1), Err(SimError::OutOfMemory { .. })));
        assert!(matches!(buddy.free(8), Err(SimError::NotFound(_))));
    }
}
