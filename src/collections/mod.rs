//! Bookkeeping structures layered over the allocators.

pub mod registry;

pub use registry::{bucket_index, AllocationRecord, BlockRegistry, Chain};
