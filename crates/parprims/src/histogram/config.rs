//! Launch configuration for the device histogram.
//!
//! [`HistogramConfig`] holds the grid launch constants and the execution
//! knobs. It uses the `bon` crate for builder generation with validation.
//!
//! # Example
//!
//! ```
//! use parprims::histogram::HistogramConfig;
//! use parprims::Verbosity;
//!
//! // All defaults
//! let config = HistogramConfig::builder().build().unwrap();
//! assert_eq!(config.block_size, 256);
//!
//! // Force the global strategy for anything above 64 bins
//! let config = HistogramConfig::builder()
//!     .shared_impl_max_bins(64)
//!     .n_threads(4)
//!     .verbosity(Verbosity::Debug)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;

use crate::error::ConfigError;
use crate::logger::Verbosity;

/// Configuration for [`DeviceHistogram`](super::DeviceHistogram).
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct HistogramConfig {
    // === Launch shape ===
    /// Lanes per block. Default: 256.
    #[builder(default = 256)]
    pub block_size: usize,

    /// Pixels each lane reads per tile. Default: 8.
    #[builder(default = 8)]
    pub items_per_thread: usize,

    /// Cap on the privatized grid's block count. Default: 1024.
    #[builder(default = 1024)]
    pub max_grid_size: usize,

    // === Strategy selection ===
    /// Largest total bin count (over active channels) that is accumulated
    /// in block-local counters. Above this the global strategy is used.
    /// Default: 1024.
    #[builder(default = 1024)]
    pub shared_impl_max_bins: usize,

    // === Resource control ===
    /// Number of threads. `0` uses the current rayon pool, `1` runs blocks
    /// sequentially. Default: 0.
    #[builder(default = 0)]
    pub n_threads: usize,

    // === Logging ===
    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

impl<S: histogram_config_builder::IsComplete> HistogramConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `block_size`, `items_per_thread` or
    /// `max_grid_size` is zero.
    pub fn build(self) -> Result<HistogramConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl HistogramConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        if self.items_per_thread == 0 {
            return Err(ConfigError::InvalidItemsPerThread);
        }
        if self.max_grid_size == 0 {
            return Err(ConfigError::InvalidMaxGridSize);
        }
        Ok(())
    }

    /// Pixels covered by one block tile.
    #[inline]
    pub fn items_per_block(&self) -> usize {
        self.block_size * self.items_per_thread
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}
