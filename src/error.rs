//! Error types shared by every allocator, the registry and the comparison
//! session.

use thiserror::Error;

/// Errors reported by `memlab` operations.
///
/// All variants are recoverable: nothing in the crate aborts the process on
/// a caller error.
#[derive(Debug, Error)]
pub enum SimError {
    /// A size or configuration value is zero, out of range, or otherwise
    /// unusable.
    #[error("invalid parameter `{what}`: {value}")]
    InvalidParameter {
        /// Name of the offending parameter.
        what: &'static str,
        /// The rejected value.
        value: usize,
    },

    /// No free block or size class can satisfy the request.
    #[error("out of memory: no free block can hold {requested} bytes")]
    OutOfMemory {
        /// Requested size in bytes.
        requested: usize,
    },

    /// `free` or `remove` targeted an offset or key that is not live.
    #[error("not found: {0}")]
    NotFound(String),

    /// A registry record could not be created.
    #[error("allocation for key `{key}` failed: {reason}")]
    AllocationFailed {
        /// Key of the record being inserted.
        key: String,
        /// Why the record could not be stored.
        reason: String,
    },

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl SimError {
    pub(crate) fn invalid(what: &'static str, value: usize) -> Self {
        Self::InvalidParameter { what, value }
    }

    pub(crate) fn offset_not_found(offset: usize) -> Self {
        Self::NotFound(format!("no block starts at offset {offset}"))
    }
}

/// Result type for `memlab` operations.
pub type Result<T> = std::result::Result<T, SimError>;
