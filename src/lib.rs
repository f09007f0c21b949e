//! # `memlab` - Allocation Strategy Laboratory
//!
//! Models three classic ways of carving up a fixed-size memory arena and
//! compares them by internal fragmentation ("waste") and wall-clock time.
//!
//! ## Strategies
//!
//! 1. **Fixed partitions** ([`FixedPartitionAllocator`]):
//!    - The arena is cut into `floor(capacity / partition_size)` equal slots
//!    - Each slot holds one simulated request; the rest of the slot is waste
//!
//! 2. **First fit** ([`FirstFitAllocator`]):
//!    - Offset-ordered block list that always tiles the arena
//!    - Lowest-offset hole that fits is split; frees coalesce both neighbours
//!
//! 3. **Buddy system** ([`BuddySystemAllocator`]):
//!    - Requests round up to a power-of-two class
//!    - Per-order free lists, buddy split on allocate, XOR-buddy merge on free
//!
//! [`ComparisonSession`] times each strategy through [`measure`], sums waste
//! and time per strategy, and ranks them with ties resolved in
//! [`Strategy::PRIORITY`] order. [`BlockRegistry`] is a fixed-bucket chained
//! hash table that names arena ranges by string key.
//!
//! ## Threading
//!
//! Everything here is single-threaded. Mutating operations take `&mut self`,
//! so a multi-threaded host must provide its own synchronisation.
//!
//! ## Example
//!
//! ```rust
//! use memlab::{ComparisonSession, FixedSequence, SimConfig, Strategy};
//!
//! let config = SimConfig::with_capacity(1024);
//! let mut session = ComparisonSession::new(config, FixedSequence::new([100, 200])).unwrap();
//!
//! session.select_strategy(Strategy::FixedPartition, 256).unwrap();
//! let report = session.select_strategy(Strategy::Buddy, 10).unwrap();
//! assert_eq!(report.waste, 6);
//!
//! let ranking = session.compare();
//! assert_eq!(ranking.per_strategy.len(), 3);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod alloc;
pub mod arena;
pub mod collections;
pub mod compare;
pub mod config;
pub mod error;
pub mod source;
pub mod timing;

pub use alloc::{
    size_class,
    Allocation,
    Block,
    BlockAllocator,
    BlockState,
    BuddySystemAllocator,
    FirstFitAllocator,
    FixedPartitionAllocator,
    PartitionRun,
    PartitionSlot,
};
pub use arena::Arena;
pub use collections::{AllocationRecord, BlockRegistry};
pub use compare::{Comparison, ComparisonPlan, ComparisonSession, RunReport, Strategy, StrategyStats};
pub use config::SimConfig;
pub use error::{Result, SimError};
pub use source::{FixedSequence, RequestSource, SeededRequests};
pub use timing::{measure, Timed};
