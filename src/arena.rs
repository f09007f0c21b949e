//! The backing byte range every strategy carves up.

use core::ops::Range;

use crate::error::{Result, SimError};

/// A single contiguous, zero-initialised byte buffer of fixed capacity.
///
/// The arena never grows. Allocators hand out offsets into it; callers that
/// need the bytes themselves go through [`Arena::slice`] and
/// [`Arena::slice_mut`].
#[derive(Debug, Clone)]
pub struct Arena {
    bytes: Box<[u8]>,
}

impl Arena {
    /// Allocates a zeroed arena of `capacity` bytes.
    ///
    /// # Errors
    /// `InvalidParameter` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SimError::invalid("arena_capacity", capacity));
        }
        Ok(Self { bytes: vec![0u8; capacity].into_boxed_slice() })
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Borrows `range`, or `None` if it runs past the end of the arena.
    pub fn slice(&self, range: Range<usize>) -> Option<&[u8]> {
        self.bytes.get(range)
    }

    /// Mutably borrows `range`, or `None` if it runs past the end of the arena.
    pub fn slice_mut(&mut self, range: Range<usize>) -> Option<&mut [u8]> {
        self.bytes.get_mut(range)
    }

    /// Zeroes `range`. Out-of-bounds ranges are ignored.
    pub fn clear(&mut self, range: Range<usize>) {
        if let Some(bytes) = self.bytes.get_mut(range) {
            bytes.fill(0);
        }
    }
}
