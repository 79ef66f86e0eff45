//! parprims: data-parallel primitives for compute-grid algorithms.
//!
//! Two building blocks, executed on the CPU with a SIMT-style grid model
//! (blocks as rayon tasks, lanes in barrier-separated phases):
//!
//! - [`BlockScan`]: block-wide inclusive and exclusive scans composed from
//!   a lockstep-group scan capability ([`LockstepScan`]).
//! - [`histogram`]: a device-wide multi-channel histogram with a two-call
//!   temporary storage protocol and two accumulation strategies.
//!
//! # Key Types
//!
//! - [`BlockScan`] / [`ScanStorage`] - Block scan and its shared slots
//! - [`ShuffleScan`] / [`SerialScan`] - Lockstep scan implementations
//! - [`DeviceHistogram`] / [`HistogramConfig`] - Histogram orchestrator and its configuration
//! - [`EvenBins`] / [`RangeBins`] - Bin mappers
//!
//! # Scanning a block
//!
//! ```
//! use parprims::{BlockScan, ShuffleScan};
//!
//! let scan = BlockScan::new(256, ShuffleScan::native()).unwrap();
//! let input = vec![1u32; 256];
//! let mut output = vec![0u32; 256];
//! let total = scan.exclusive_scan(&input, &mut output, 0, |a, b| a + b);
//! assert_eq!(output[255], 255);
//! assert_eq!(total, 256);
//! ```

pub mod block;
pub mod error;
pub mod grid;
pub mod histogram;
pub mod logger;
pub mod testing;
pub mod utils;
pub mod warp;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Block scan
pub use block::{BlockScan, ScanStorage};
pub use warp::{HARDWARE_WARP_SIZE, LockstepScan, SerialScan, ShuffleScan};

// Histogram
pub use histogram::{
    BinMapper, Counter, DeviceHistogram, EvenBins, HistogramConfig, Level, RangeBins,
};

// Errors
pub use error::{ConfigError, Error, Result};

// Shared utilities
pub use logger::Verbosity;
pub use utils::{Parallelism, run_with_threads};
