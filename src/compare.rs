//! Timed runs of every strategy and the ranked comparison between them.
//!
//! A [`ComparisonSession`] owns one allocator per strategy plus a
//! [`StrategyStats`] accumulator for each. Waste and elapsed time are summed
//! over every successful run of a strategy until the session is reset.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::alloc::{BlockAllocator, BuddySystemAllocator, FirstFitAllocator, FixedPartitionAllocator};
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::source::RequestSource;
use crate::timing::measure;

/// The three allocation strategies, declared in tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Equal-size partitions.
    FixedPartition,
    /// First-fit over a free-block list.
    FirstFit,
    /// Binary buddy system.
    Buddy,
}

impl Strategy {
    /// Every strategy; earlier entries win ties when ranking.
    pub const PRIORITY: [Strategy; 3] = [Strategy::FixedPartition, Strategy::FirstFit, Strategy::Buddy];

    /// Stable kebab-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Strategy::FixedPartition => "fixed-partition",
            Strategy::FirstFit => "first-fit",
            Strategy::Buddy => "buddy",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names no strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy `{0}` (expected fixed-partition, first-fit or buddy)")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "fixed-partition" => Ok(Strategy::FixedPartition),
            "first-fit" | "firstfit" => Ok(Strategy::FirstFit),
            "buddy" => Ok(Strategy::Buddy),
            _ => Err(ParseStrategyError(s.to_owned())),
        }
    }
}

/// Accumulated waste and time for one strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrategyStats {
    /// Sum of per-run waste in bytes.
    pub total_waste: usize,
    /// Sum of per-run wall-clock time.
    pub elapsed: Duration,
    /// Number of successful runs recorded.
    pub runs: usize,
}

impl StrategyStats {
    fn record(&mut self, waste: usize, elapsed: Duration) {
        self.total_waste += waste;
        self.elapsed += elapsed;
        self.runs += 1;
    }
}

/// What a single `select_strategy` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Strategy that ran.
    pub strategy: Strategy,
    /// Partition size (fixed) or request size (first-fit, buddy).
    pub size: usize,
    /// Offset of the granted block; `None` for fixed partitioning.
    pub offset: Option<usize>,
    /// Bytes consumed by requests.
    pub used: usize,
    /// Bytes wasted by this run.
    pub waste: usize,
    /// Wall-clock time of the allocator call.
    pub elapsed: Duration,
}

/// Ranked view of every strategy's accumulators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// Strategy with the least accumulated time.
    pub fastest: Strategy,
    /// Strategy with the least accumulated waste.
    pub least_waste: Strategy,
    /// Accumulators of all three strategies.
    pub per_strategy: BTreeMap<Strategy, StrategyStats>,
}

impl Comparison {
    /// Ranks `stats`; strategies absent from the map count as zero.
    ///
    /// Ties go to the earlier strategy in [`Strategy::PRIORITY`].
    pub fn from_stats(stats: &BTreeMap<Strategy, StrategyStats>) -> Self {
        let per_strategy: BTreeMap<Strategy, StrategyStats> = Strategy::PRIORITY
            .into_iter()
            .map(|s| (s, stats.get(&s).copied().unwrap_or_default()))
            .collect();

        // `min_by_key` keeps the first of equal minima.
        let fastest = Strategy::PRIORITY
            .into_iter()
            .min_by_key(|s| per_strategy[s].elapsed)
            .unwrap_or(Strategy::FixedPartition);
        let least_waste = Strategy::PRIORITY
            .into_iter()
            .min_by_key(|s| per_strategy[s].total_waste)
            .unwrap_or(Strategy::FixedPartition);

        Self { fastest, least_waste, per_strategy }
    }
}

/// Sizes for one run of every strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPlan {
    /// Partition size for the fixed-partition run.
    pub partition_size: usize,
    /// Requests sent, in order, to both first-fit and buddy.
    pub requests: Vec<usize>,
}

/// Owns the allocators and the per-strategy accumulators.
///
/// Not internally synchronised; share it across threads only behind a lock.
pub struct ComparisonSession {
    config: SimConfig,
    source: Box<dyn RequestSource>,
    fixed: FixedPartitionAllocator,
    first_fit: FirstFitAllocator,
    buddy: BuddySystemAllocator,
    stats: BTreeMap<Strategy, StrategyStats>,
}

impl ComparisonSession {
    /// Creates a session whose fixed-partition runs draw request sizes from
    /// `source`.
    ///
    /// # Errors
    /// `InvalidParameter` if `config` fails validation or its arena capacity
    /// is not a power of two.
    pub fn new(config: SimConfig, source: impl RequestSource + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source: Box::new(source),
            fixed: FixedPartitionAllocator::new(config.arena_capacity)?,
            first_fit: FirstFitAllocator::new(config.arena_capacity)?,
            buddy: BuddySystemAllocator::from_config(&config)?,
            stats: BTreeMap::new(),
        })
    }

    /// The configuration the session was built with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs `strategy` once with `size` under timing and records the result.
    ///
    /// Fixed partitioning treats `size` as the partition size; first-fit and
    /// buddy allocate `size` bytes from their session-lived arena.
    ///
    /// # Errors
    /// `InvalidParameter` for sizes out of range, `OutOfMemory` when the
    /// strategy's arena is exhausted. Failed runs are not recorded.
    pub fn select_strategy(&mut self, strategy: Strategy, size: usize) -> Result<RunReport> {
        let report = match strategy {
            Strategy::FixedPartition => {
                let source = &mut self.source;
                let fixed = &mut self.fixed;
                let timed = measure(|| fixed.run(size, source)).transpose()?;
                RunReport {
                    strategy,
                    size,
                    offset: None,
                    used: timed.value.used,
                    waste: timed.value.waste,
                    elapsed: timed.elapsed,
                }
            }
            Strategy::FirstFit | Strategy::Buddy => {
                if size == 0 || size > self.config.max_request {
                    return Err(SimError::invalid("request_size", size));
                }
                let allocator: &mut dyn BlockAllocator = match strategy {
                    Strategy::FirstFit => &mut self.first_fit,
                    _ => &mut self.buddy,
                };
                let timed = measure(|| allocator.allocate(size)).transpose()?;
                RunReport {
                    strategy,
                    size,
                    offset: Some(timed.value.offset),
                    used: timed.value.requested,
                    waste: timed.value.waste,
                    elapsed: timed.elapsed,
                }
            }
        };

        self.stats.entry(strategy).or_default().record(report.waste, report.elapsed);
        info!(%strategy, size, waste = report.waste, elapsed = ?report.elapsed, "run recorded");
        Ok(report)
    }

    /// Frees a block previously returned by a first-fit or buddy run.
    ///
    /// # Errors
    /// `InvalidParameter` for fixed partitioning, which has nothing to free;
    /// `NotFound` if `offset` is not a live block.
    pub fn free(&mut self, strategy: Strategy, offset: usize) -> Result<()> {
        match strategy {
            Strategy::FixedPartition => Err(SimError::invalid("offset", offset)),
            Strategy::FirstFit => self.first_fit.free(offset),
            Strategy::Buddy => self.buddy.free(offset),
        }
    }

    /// Accumulators for `strategy` (zero if it never ran).
    pub fn stats(&self, strategy: Strategy) -> StrategyStats {
        self.stats.get(&strategy).copied().unwrap_or_default()
    }

    /// Ranks the current accumulators.
    pub fn compare(&self) -> Comparison {
        let comparison = Comparison::from_stats(&self.stats);
        info!(fastest = %comparison.fastest, least_waste = %comparison.least_waste, "comparison");
        comparison
    }

    /// Runs every strategy once per plan entry, then ranks the result.
    ///
    /// # Errors
    /// The first failing run's error; runs before it stay recorded.
    pub fn run_plan(&mut self, plan: &ComparisonPlan) -> Result<Comparison> {
        self.select_strategy(Strategy::FixedPartition, plan.partition_size)?;
        for strategy in [Strategy::FirstFit, Strategy::Buddy] {
            for &size in &plan.requests {
                self.select_strategy(strategy, size)?;
            }
        }
        Ok(self.compare())
    }

    /// Clears the accumulators of `strategy`, leaving its allocator untouched.
    pub fn reset_strategy(&mut self, strategy: Strategy) {
        self.stats.remove(&strategy);
    }

    /// Clears every accumulator and frees every allocator.
    pub fn reset(&mut self) {
        self.stats.clear();
        self.first_fit.reset();
        self.buddy.reset();
    }
}
