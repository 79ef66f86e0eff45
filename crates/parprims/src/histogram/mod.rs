//! Device-wide multi-channel histogram.
//!
//! # Overview
//!
//! ```text
//! caller ─► DeviceHistogram ─► validate ─► sizing call? ─► return size
//!                                              │
//!                                              ▼
//!                                   init_histogram (zero counters)
//!                                              │
//!                      total bins <= shared_impl_max_bins?
//!                         yes │                    │ no
//!                             ▼                    ▼
//!                     histogram_shared      histogram_global
//!                 (block-local counters,    (atomic add per sample
//!                  flushed per block)        into global counters)
//! ```
//!
//! Bins are computed by a per-channel [`BinMapper`]: [`EvenBins`] for
//! equal-width bins, [`RangeBins`] for explicit boundaries.

mod bin_mapper;
mod config;
mod counter;
mod device;
mod kernels;

pub use bin_mapper::{BinMapper, EvenBins, Level, RangeBins};
pub use config::{HistogramConfig, HistogramConfigBuilder};
pub use counter::Counter;
pub use device::{
    DeviceHistogram, TEMPORARY_STORAGE_BYTES, histogram_even, histogram_even_2d, histogram_range,
    histogram_range_2d, multi_histogram_even, multi_histogram_even_2d, multi_histogram_range,
    multi_histogram_range_2d,
};
