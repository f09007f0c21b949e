//! First-fit allocation over an offset-ordered block list.
//!
//! The list always tiles the arena exactly: blocks are contiguous, never
//! overlap, and no two neighbouring blocks are both free.

use tracing::{debug, trace};

use super::allocator::{check_request, Allocation, Block, BlockAllocator};
use crate::error::{Result, SimError};

/// First-fit allocator.
///
/// `allocate` takes the lowest-offset free block that is large enough,
/// splitting off the remainder as a new free block. `free` coalesces with
/// free neighbours on both sides.
#[derive(Debug, Clone)]
pub struct FirstFitAllocator {
    capacity: usize,
    blocks: Vec<Block>,
    waste: usize,
}

impl FirstFitAllocator {
    /// Creates an allocator whose arena is one free block of `capacity` bytes.
    ///
    /// # Errors
    /// `InvalidParameter` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SimError::invalid("arena_capacity", capacity));
        }
        Ok(Self { capacity, blocks: vec![Block::free(0, capacity)], waste: 0 })
    }

    /// Length of the largest free block, `0` when the arena is full.
    pub fn largest_free(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_free()).map(|b| b.length).max().unwrap_or(0)
    }

    /// Returns every block to the free state and clears the waste counter.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.blocks.push(Block::free(0, self.capacity));
        self.waste = 0;
    }

    fn debug_check(&self) {
        debug_assert_eq!(self.blocks.first().map(|b| b.offset), Some(0));
        debug_assert!(self.blocks.windows(2).all(|w| w[0].end() == w[1].offset));
        debug_assert!(self.blocks.windows(2).all(|w| !(w[0].is_free() && w[1].is_free())));
        debug_assert_eq!(self.blocks.last().map(Block::end), Some(self.capacity));
    }
}

impl BlockAllocator for FirstFitAllocator {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn allocate(&mut self, size: usize) -> Result<Allocation> {
        check_request(size, self.capacity)?;

        let index = self
            .blocks
            .iter()
            .position(|b| b.is_free() && b.length >= size)
            .ok_or(SimError::OutOfMemory { requested: size })?;

        let selected = self.blocks[index];
        let slack = selected.length - size;
        self.blocks[index] = Block::occupied(selected.offset, size);
        if slack > 0 {
            trace!(offset = selected.offset + size, length = slack, "split remainder");
            self.blocks.insert(index + 1, Block::free(selected.offset + size, slack));
        }
        self.waste += slack;
        self.debug_check();

        debug!(offset = selected.offset, size, hole = selected.length, "first-fit allocate");
        Ok(Allocation { offset: selected.offset, requested: size, granted: size, waste: slack })
    }

    fn free(&mut self, offset: usize) -> Result<()> {
        let mut index = match self.blocks.binary_search_by_key(&offset, |b| b.offset) {
            Ok(i) if !self.blocks[i].is_free() => i,
            _ => return Err(SimError::offset_not_found(offset)),
        };

        let length = self.blocks[index].length;
        self.blocks[index] = Block::free(offset, length);

        if self.blocks.get(index + 1).is_some_and(Block::is_free) {
            let next = self.blocks.remove(index + 1);
            self.blocks[index].length += next.length;
            trace!(offset, absorbed = next.offset, "merge with next");
        }
        if index > 0 && self.blocks[index - 1].is_free() {
            let current = self.blocks.remove(index);
            index -= 1;
            self.blocks[index].length += current.length;
            trace!(offset = self.blocks[index].offset, absorbed = current.offset, "merge with previous");
        }
        self.debug_check();

        debug!(offset, length, "first-fit free");
        Ok(())
    }

    fn blocks(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    fn total_waste(&self) -> usize {
        self.waste
    }
}
