//! Equal-size partitioning of the arena.

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SimError};
use crate::source::RequestSource;

/// One equal-size partition and the bytes its request actually used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionSlot {
    /// Position of the slot in the arena, starting at 0.
    pub slot_index: usize,
    /// Size of every slot in this run.
    pub partition_size: usize,
    /// Bytes of the slot consumed by its request; never above `partition_size`.
    pub used_bytes: usize,
}

impl PartitionSlot {
    /// Unused bytes inside the slot.
    #[inline]
    pub const fn waste(&self) -> usize {
        self.partition_size - self.used_bytes
    }
}

/// Totals of one fixed-partition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionRun {
    /// Size of each partition.
    pub partition_size: usize,
    /// `floor(arena_capacity / partition_size)`.
    pub slot_count: usize,
    /// Bytes consumed by requests.
    pub used: usize,
    /// Unused bytes inside partitions.
    pub waste: usize,
}

/// Splits the arena into `floor(capacity / partition_size)` equal slots and
/// places one simulated request in each.
///
/// Bytes past the last whole slot are not part of any partition and are not
/// counted as waste.
#[derive(Debug, Clone)]
pub struct FixedPartitionAllocator {
    capacity: usize,
    slots: Vec<PartitionSlot>,
}

impl FixedPartitionAllocator {
    /// Creates an allocator over `capacity` bytes with no partitions yet.
    ///
    /// # Errors
    /// `InvalidParameter` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SimError::invalid("arena_capacity", capacity));
        }
        Ok(Self { capacity, slots: Vec::new() })
    }

    /// Arena size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Re-partitions the arena and fills every slot with a request of
    /// `1..=partition_size` bytes drawn from `source`.
    ///
    /// # Errors
    /// `InvalidParameter` if `partition_size` is zero or larger than the arena.
    pub fn run<S>(&mut self, partition_size: usize, mut source: S) -> Result<PartitionRun>
    where
        S: RequestSource,
    {
        if partition_size == 0 || partition_size > self.capacity {
            return Err(SimError::invalid("partition_size", partition_size));
        }

        let slot_count = self.capacity / partition_size;
        self.slots.clear();
        self.slots.extend((0..slot_count).map(|slot_index| PartitionSlot {
            slot_index,
            partition_size,
            used_bytes: source.next_request(partition_size).min(partition_size),
        }));

        let used = self.slots.iter().map(|s| s.used_bytes).sum();
        let waste = self.slots.iter().map(PartitionSlot::waste).sum();

        debug!(partition_size, slot_count, used, waste, "fixed partition run");
        Ok(PartitionRun { partition_size, slot_count, used, waste })
    }

    /// Slots of the most recent run.
    pub fn slots(&self) -> &[PartitionSlot] {
        &self.slots
    }
}
