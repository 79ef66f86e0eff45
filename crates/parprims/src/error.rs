//! Error types shared by the scan and histogram primitives.

/// Errors raised before any block or grid work is dispatched.
///
/// Every variant is a hard stop: nothing here is transient, and a failed
/// call leaves the caller's counters untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An argument violates the primitive's contract (too few levels,
    /// misaligned row stride, mismatched per-channel arrays, ...).
    #[error("invalid argument `{arg}`: {reason}")]
    InvalidArgument { arg: &'static str, reason: String },

    /// The temporary storage passed to a real call is shorter than the size
    /// reported by the sizing call.
    #[error("temporary storage too small: {required} bytes required, {provided} provided")]
    AllocationTooSmall { required: usize, provided: usize },

    /// The dedicated worker pool could not be created.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

impl Error {
    pub(crate) fn invalid(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Block size must be at least 1.
    #[error("block_size must be at least 1")]
    InvalidBlockSize,
    /// Items per thread must be at least 1.
    #[error("items_per_thread must be at least 1")]
    InvalidItemsPerThread,
    /// Maximum grid size must be at least 1.
    #[error("max_grid_size must be at least 1")]
    InvalidMaxGridSize,
}
