//! Allocation strategies over a fixed-size arena.

pub mod allocator;
pub mod buddy;
pub mod first_fit;
pub mod fixed;

pub use allocator::{Allocation, Block, BlockAllocator, BlockState};
pub use buddy::{size_class, BuddySystemAllocator};
pub use first_fit::FirstFitAllocator;
pub use fixed::{FixedPartitionAllocator, PartitionRun, PartitionSlot};
