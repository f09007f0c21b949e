//! The interface shared by the offset-based strategies.

use serde::Serialize;

use crate::error::{Result, SimError};

/// Whether a block currently belongs to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockState {
    /// Available to satisfy requests.
    Free,
    /// Handed out and not yet freed.
    Occupied,
}

/// One entry of an allocator's block layout, addressed by arena offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Block {
    /// First byte of the block.
    pub offset: usize,
    /// Length in bytes.
    pub length: usize,
    /// Free or occupied.
    pub state: BlockState,
}

impl Block {
    pub(crate) const fn free(offset: usize, length: usize) -> Self {
        Self { offset, length, state: BlockState::Free }
    }

    pub(crate) const fn occupied(offset: usize, length: usize) -> Self {
        Self { offset, length, state: BlockState::Occupied }
    }

    /// One past the last byte.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.length
    }

    /// `true` if the block is available.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.state == BlockState::Free
    }
}

/// The outcome of a successful allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// Arena offset of the granted block.
    pub offset: usize,
    /// Bytes the caller asked for.
    pub requested: usize,
    /// Bytes actually reserved for the caller.
    pub granted: usize,
    /// Bytes this allocation counts as wasted under the strategy's model.
    pub waste: usize,
}

/// A strategy that hands out and takes back ranges of a fixed-size arena.
///
/// Implementations are single-threaded: every mutating call takes
/// `&mut self`, so a multi-threaded host must wrap the allocator in its own
/// lock.
pub trait BlockAllocator {
    /// Size of the arena this allocator manages.
    fn capacity(&self) -> usize;

    /// Reserves at least `size` bytes.
    ///
    /// # Errors
    /// `InvalidParameter` for a zero or over-capacity size, `OutOfMemory`
    /// when no free block can hold it.
    fn allocate(&mut self, size: usize) -> Result<Allocation>;

    /// Releases the block starting at `offset`.
    ///
    /// # Errors
    /// `NotFound` if no occupied block starts at `offset`.
    fn free(&mut self, offset: usize) -> Result<()>;

    /// The current layout in ascending offset order.
    fn blocks(&self) -> Vec<Block>;

    /// Waste accumulated by every allocation since construction or the last
    /// reset.
    fn total_waste(&self) -> usize;

    /// Sum of free bytes.
    fn free_bytes(&self) -> usize {
        self.blocks().iter().filter(|b| b.is_free()).map(|b| b.length).sum()
    }
}

pub(crate) fn check_request(size: usize, capacity: usize) -> Result<()> {
    if size == 0 || size > capacity {
        return Err(SimError::invalid("request_size", size));
    }
    Ok(())
}
