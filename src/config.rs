//! Simulation parameters.
//!
//! Every constant the allocators depend on lives here so tests can run the
//! same code against tiny arenas.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// 1 MiB arena.
pub const DEFAULT_ARENA_CAPACITY: usize = 1024 * 1024;
/// Largest single request accepted by the comparison session.
pub const DEFAULT_MAX_REQUEST: usize = 4096;
/// Number of registry buckets.
pub const DEFAULT_BUCKET_COUNT: usize = 10;
/// Smallest buddy block. `1` keeps `class(n)` equal to the next power of two.
pub const DEFAULT_MIN_BLOCK_SIZE: usize = 1;

/// Parameters shared by the arena, the allocators and the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSimConfig")]
pub struct SimConfig {
    /// Total arena size in bytes.
    pub arena_capacity: usize,
    /// Upper bound for a single first-fit or buddy request.
    pub max_request: usize,
    /// Number of hash buckets in the block registry.
    pub bucket_count: usize,
    /// Smallest block the buddy allocator will split down to.
    pub min_block_size: usize,
}

/// On-disk shape of [`SimConfig`]; every field is optional.
#[derive(Deserialize)]
#[serde(default)]
struct RawSimConfig {
    arena_capacity: usize,
    max_request: Option<usize>,
    bucket_count: usize,
    min_block_size: usize,
}

impl Default for RawSimConfig {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            max_request: None,
            bucket_count: DEFAULT_BUCKET_COUNT,
            min_block_size: DEFAULT_MIN_BLOCK_SIZE,
        }
    }
}

impl From<RawSimConfig> for SimConfig {
    fn from(raw: RawSimConfig) -> Self {
        let config = Self::with_capacity(raw.arena_capacity)
            .with_bucket_count(raw.bucket_count)
            .with_min_block_size(raw.min_block_size);
        match raw.max_request {
            Some(max_request) => config.with_max_request(max_request),
            None => config,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            max_request: DEFAULT_MAX_REQUEST,
            bucket_count: DEFAULT_BUCKET_COUNT,
            min_block_size: DEFAULT_MIN_BLOCK_SIZE,
        }
    }
}

impl SimConfig {
    /// Config for an arena of `arena_capacity` bytes; the request bound is
    /// clamped so it never exceeds the arena.
    pub fn with_capacity(arena_capacity: usize) -> Self {
        Self {
            arena_capacity,
            max_request: DEFAULT_MAX_REQUEST.min(arena_capacity),
            ..Self::default()
        }
    }

    /// Sets the single-request bound.
    #[must_use]
    pub fn with_max_request(mut self, max_request: usize) -> Self {
        self.max_request = max_request;
        self
    }

    /// Sets the registry bucket count.
    #[must_use]
    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Sets the smallest buddy block.
    #[must_use]
    pub fn with_min_block_size(mut self, min_block_size: usize) -> Self {
        self.min_block_size = min_block_size;
        self
    }

    /// Parses a JSON document; missing fields take their defaults, except
    /// that an absent `max_request` is clamped to the arena capacity.
    ///
    /// # Errors
    /// `Config` if the document is malformed, `InvalidParameter` if the
    /// parsed values fail [`SimConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the cross-field constraints.
    ///
    /// # Errors
    /// `InvalidParameter` naming the first field that is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.arena_capacity == 0 {
            return Err(SimError::invalid("arena_capacity", self.arena_capacity));
        }
        if self.bucket_count == 0 {
            return Err(SimError::invalid("bucket_count", self.bucket_count));
        }
        if self.max_request == 0 || self.max_request > self.arena_capacity {
            return Err(SimError::invalid("max_request", self.max_request));
        }
        if !self.min_block_size.is_power_of_two() || self.min_block_size > self.arena_capacity {
            return Err(SimError::invalid("min_block_size", self.min_block_size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert_eq!(config.arena_capacity, 1024 * 1024);
        assert_eq!(config.max_request, 4096);
        assert_eq!(config.bucket_count, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimConfig::from_json(r#"{ "arena_capacity": 2048 }"#).unwrap();
        assert_eq!(config.arena_capacity, 2048);
        assert_eq!(config.max_request, 2048);
        assert_eq!(config.bucket_count, DEFAULT_BUCKET_COUNT);
    }

    #[test]
    fn small_arena_clamps_missing_request_bound() {
        let config = SimConfig::from_json(r#"{ "arena_capacity": 1024 }"#).unwrap();
        assert_eq!(config.max_request, 1024);

        let config = SimConfig::from_json(r#"{ "arena_capacity": 1024, "max_request": 100 }"#).unwrap();
        assert_eq!(config.max_request, 100);

        let config = SimConfig::from_json("{}").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn explicit_request_bound_is_still_validated() {
        let err = SimConfig::from_json(r#"{ "arena_capacity": 64, "max_request": 128 }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { what: "max_request", .. }));
    }

    #[test]
    fn rejects_request_bound_above_capacity() {
        let err = SimConfig::with_capacity(64).with_max_request(65).validate().unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { what: "max_request", .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(SimConfig::from_json("{"), Err(SimError::Config(_))));
    }

    #[test]
    fn rejects_non_power_of_two_min_block() {
        let err = SimConfig::with_capacity(64).with_min_block_size(3).validate().unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { what: "min_block_size", .. }));
    }
}
