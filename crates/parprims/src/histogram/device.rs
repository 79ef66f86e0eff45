//! Device-wide histogram entry points.
//!
//! Every entry point follows the two-call temporary storage protocol:
//!
//! ```text
//! histogram_even(None, &mut size, ...)          // sizing: writes `size`, counts nothing
//! let mut storage = vec![0u8; size];
//! histogram_even(Some(storage.as_mut_slice()), &mut size, ...)  // real call
//! ```
//!
//! A real call runs up to two grid passes on the configured thread pool:
//!
//! 1. `init_histogram` zeroes the active channels' counters;
//! 2. `histogram_shared` (privatized, when the total bin count is at most
//!    [`HistogramConfig::shared_impl_max_bins`]) or `histogram_global`.
//!
//! # Example
//!
//! ```
//! use parprims::histogram::histogram_even;
//!
//! let samples = [-10.0f32, 0.3, 9.5, 8.1, 1.5, 1.9, 100.0, 5.1];
//! let mut histogram = [0u32; 5];
//!
//! let mut storage_size = 0;
//! histogram_even(None, &mut storage_size, &samples, &mut histogram, 6, 0.0f32, 10.0).unwrap();
//! let mut storage = vec![0u8; storage_size];
//! histogram_even(Some(storage.as_mut_slice()), &mut storage_size, &samples, &mut histogram, 6, 0.0f32, 10.0)
//!     .unwrap();
//!
//! assert_eq!(histogram, [3, 0, 1, 0, 2]);
//! ```

use super::bin_mapper::{BinMapper, EvenBins, Level, RangeBins};
use super::config::HistogramConfig;
use super::counter::Counter;
use super::kernels::{HistogramPass, Region};
use crate::error::{Error, Result};
use crate::grid::{GridDim, launch};
use crate::logger::DispatchLogger;
use crate::utils::run_with_threads;

/// Bytes reported by a sizing call.
///
/// The histogram needs no scratch memory; the size is non-zero so that a
/// caller never allocates an empty buffer.
pub const TEMPORARY_STORAGE_BYTES: usize = 4;

/// Histogram orchestrator: validation, storage sizing, strategy selection
/// and dispatch.
#[derive(Debug, Clone, Default)]
pub struct DeviceHistogram {
    config: HistogramConfig,
}

impl DeviceHistogram {
    pub fn new(config: HistogramConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HistogramConfig {
        &self.config
    }

    // =========================================================================
    // Even
    // =========================================================================

    /// Histogram of `samples` in `levels - 1` equal-width bins over
    /// `[lower, upper)`.
    #[allow(clippy::too_many_arguments)]
    pub fn histogram_even<S, C, L>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        histogram: &mut [C],
        levels: u32,
        lower: L,
        upper: L,
    ) -> Result<()>
    where
        S: Copy + Send + Sync + Into<L>,
        C: Counter,
        L: Level,
    {
        self.multi_histogram_even::<1, S, C, L>(
            storage,
            storage_size,
            samples,
            &mut [histogram],
            &[levels],
            &[lower],
            &[upper],
        )
    }

    /// [`histogram_even`](Self::histogram_even) over a `columns x rows`
    /// region whose rows start `row_stride_bytes` apart.
    #[allow(clippy::too_many_arguments)]
    pub fn histogram_even_2d<S, C, L>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        columns: usize,
        rows: usize,
        row_stride_bytes: usize,
        histogram: &mut [C],
        levels: u32,
        lower: L,
        upper: L,
    ) -> Result<()>
    where
        S: Copy + Send + Sync + Into<L>,
        C: Counter,
        L: Level,
    {
        self.multi_histogram_even_2d::<1, S, C, L>(
            storage,
            storage_size,
            samples,
            columns,
            rows,
            row_stride_bytes,
            &mut [histogram],
            &[levels],
            &[lower],
            &[upper],
        )
    }

    /// Equal-width histograms of the first `histograms.len()` channels of
    /// interleaved `CHANNELS`-sample pixels.
    #[allow(clippy::too_many_arguments)]
    pub fn multi_histogram_even<const CHANNELS: usize, S, C, L>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        histograms: &mut [&mut [C]],
        levels: &[u32],
        lower: &[L],
        upper: &[L],
    ) -> Result<()>
    where
        S: Copy + Send + Sync + Into<L>,
        C: Counter,
        L: Level,
    {
        let (columns, row_stride_bytes) = linear_region::<CHANNELS, S>(samples)?;
        self.multi_histogram_even_2d::<CHANNELS, S, C, L>(
            storage,
            storage_size,
            samples,
            columns,
            1,
            row_stride_bytes,
            histograms,
            levels,
            lower,
            upper,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn multi_histogram_even_2d<const CHANNELS: usize, S, C, L>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        columns: usize,
        rows: usize,
        row_stride_bytes: usize,
        histograms: &mut [&mut [C]],
        levels: &[u32],
        lower: &[L],
        upper: &[L],
    ) -> Result<()>
    where
        S: Copy + Send + Sync + Into<L>,
        C: Counter,
        L: Level,
    {
        check_active_channels::<CHANNELS>(histograms.len())?;
        check_channel_args("levels", levels.len(), histograms.len())?;
        check_channel_args("lower", lower.len(), histograms.len())?;
        check_channel_args("upper", upper.len(), histograms.len())?;

        let mappers = levels
            .iter()
            .zip(lower)
            .zip(upper)
            .map(|((&levels, &lower), &upper)| EvenBins::new(levels, lower, upper))
            .collect::<Result<Vec<_>>>()?;

        self.histogram_impl::<CHANNELS, S, C, _>(
            storage,
            storage_size,
            samples,
            columns,
            rows,
            row_stride_bytes,
            histograms,
            &mappers,
        )
    }

    // =========================================================================
    // Range
    // =========================================================================

    /// Histogram of `samples` with bin `j` covering
    /// `[levels[j], levels[j + 1])`.
    pub fn histogram_range<S, C, L>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        histogram: &mut [C],
        levels: &[L],
    ) -> Result<()>
    where
        S: Copy + Send + Sync + Into<L>,
        C: Counter,
        L: Level,
    {
        self.multi_histogram_range::<1, S, C, L>(
            storage,
            storage_size,
            samples,
            &mut [histogram],
            &[levels],
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn histogram_range_2d<S, C, L>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        columns: usize,
        rows: usize,
        row_stride_bytes: usize,
        histogram: &mut [C],
        levels: &[L],
    ) -> Result<()>
    where
        S: Copy + Send + Sync + Into<L>,
        C: Counter,
        L: Level,
    {
        self.multi_histogram_range_2d::<1, S, C, L>(
            storage,
            storage_size,
            samples,
            columns,
            rows,
            row_stride_bytes,
            &mut [histogram],
            &[levels],
        )
    }

    pub fn multi_histogram_range<const CHANNELS: usize, S, C, L>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        histograms: &mut [&mut [C]],
        levels: &[&[L]],
    ) -> Result<()>
    where
        S: Copy + Send + Sync + Into<L>,
        C: Counter,
        L: Level,
    {
        let (columns, row_stride_bytes) = linear_region::<CHANNELS, S>(samples)?;
        self.multi_histogram_range_2d::<CHANNELS, S, C, L>(
            storage,
            storage_size,
            samples,
            columns,
            1,
            row_stride_bytes,
            histograms,
            levels,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn multi_histogram_range_2d<const CHANNELS: usize, S, C, L>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        columns: usize,
        rows: usize,
        row_stride_bytes: usize,
        histograms: &mut [&mut [C]],
        levels: &[&[L]],
    ) -> Result<()>
    where
        S: Copy + Send + Sync + Into<L>,
        C: Counter,
        L: Level,
    {
        check_active_channels::<CHANNELS>(histograms.len())?;
        check_channel_args("levels", levels.len(), histograms.len())?;

        let mappers = levels
            .iter()
            .map(|boundaries| RangeBins::new(boundaries))
            .collect::<Result<Vec<_>>>()?;

        self.histogram_impl::<CHANNELS, S, C, _>(
            storage,
            storage_size,
            samples,
            columns,
            rows,
            row_stride_bytes,
            histograms,
            &mappers,
        )
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn histogram_impl<const CHANNELS: usize, S, C, M>(
        &self,
        storage: Option<&mut [u8]>,
        storage_size: &mut usize,
        samples: &[S],
        columns: usize,
        rows: usize,
        row_stride_bytes: usize,
        histograms: &mut [&mut [C]],
        mappers: &[M],
    ) -> Result<()>
    where
        S: Copy + Send + Sync,
        C: Counter,
        M: BinMapper<S>,
    {
        let sample_size = size_of::<S>().max(1);
        if row_stride_bytes % sample_size != 0 {
            return Err(Error::invalid(
                "row_stride_bytes",
                format!(
                    "{row_stride_bytes} is not a whole multiple of the sample size {sample_size}"
                ),
            ));
        }

        let logger = DispatchLogger::new(self.config.verbosity);
        let Some(storage) = storage else {
            *storage_size = TEMPORARY_STORAGE_BYTES;
            logger.log_storage_size(*storage_size);
            return Ok(());
        };
        if storage.len() < TEMPORARY_STORAGE_BYTES {
            return Err(Error::AllocationTooSmall {
                required: TEMPORARY_STORAGE_BYTES,
                provided: storage.len(),
            });
        }

        let row_stride = row_stride_bytes / sample_size;
        for (channel, (histogram, mapper)) in histograms.iter().zip(mappers).enumerate() {
            if histogram.len() < mapper.bins() {
                return Err(Error::invalid(
                    "histograms",
                    format!(
                        "channel {channel} holds {} counters but has {} bins",
                        histogram.len(),
                        mapper.bins()
                    ),
                ));
            }
        }
        if columns > 0 && rows > 0 {
            let Some(required) = region_extent::<CHANNELS>(columns, rows, row_stride) else {
                return Err(Error::invalid(
                    "samples",
                    format!(
                        "{columns}x{rows} region with row stride {row_stride} exceeds the address space"
                    ),
                ));
            };
            if samples.len() < required {
                return Err(Error::invalid(
                    "samples",
                    format!(
                        "{columns}x{rows} region with row stride {row_stride} needs {required} samples, got {}",
                        samples.len()
                    ),
                ));
            }
        }

        let block_size = self.config.block_size;
        let blocks_x = columns.div_ceil(self.config.items_per_block());
        logger.log_region(columns, rows, blocks_x);

        let total_bins: usize = mappers.iter().map(|m| m.bins()).sum();
        let max_bins = mappers.iter().map(|m| m.bins()).max().unwrap_or(0);

        let counters: Vec<&[C::Atomic]> = histograms
            .iter_mut()
            .zip(mappers)
            .map(|(histogram, mapper)| &C::as_atomic(histogram)[..mapper.bins()])
            .collect();
        let pass = HistogramPass::<CHANNELS, S, C, M> {
            samples,
            region: Region {
                columns,
                rows,
                row_stride,
            },
            histograms: &counters,
            mappers,
            items_per_thread: self.config.items_per_thread,
        };

        let config = &self.config;
        run_with_threads(config.n_threads, |parallelism| {
            logger.time("init_histogram", max_bins, || {
                let grid = GridDim::linear(max_bins.div_ceil(block_size));
                launch(grid, block_size, parallelism, |block| pass.init(block));
            });

            if columns == 0 || rows == 0 {
                logger.warn("empty sample region, counters zeroed only");
                return;
            }

            if total_bins <= config.shared_impl_max_bins {
                logger.log_strategy("privatized", total_bins, config.shared_impl_max_bins);
                let grid_x = config.max_grid_size.min(blocks_x);
                let grid_y = rows.min(config.max_grid_size / grid_x);
                logger.time("histogram_shared", grid_x * grid_y * block_size, || {
                    launch(GridDim::new(grid_x, grid_y), block_size, parallelism, |block| {
                        pass.shared(block)
                    });
                });
            } else {
                logger.log_strategy("global", total_bins, config.shared_impl_max_bins);
                let threads = blocks_x.saturating_mul(block_size).saturating_mul(rows);
                logger.time("histogram_global", threads, || {
                    launch(GridDim::new(blocks_x, rows), block_size, parallelism, |block| {
                        pass.global(block)
                    });
                });
            }
        })
    }
}

/// Samples spanned by a non-empty region, or `None` if that overflows.
fn region_extent<const CHANNELS: usize>(
    columns: usize,
    rows: usize,
    row_stride: usize,
) -> Option<usize> {
    (rows - 1)
        .checked_mul(row_stride)?
        .checked_add(columns.checked_mul(CHANNELS)?)
}

/// Columns and row stride of a 1-D sample slice.
fn linear_region<const CHANNELS: usize, S>(samples: &[S]) -> Result<(usize, usize)> {
    if CHANNELS == 0 || samples.len() % CHANNELS != 0 {
        return Err(Error::invalid(
            "samples",
            format!(
                "{} samples is not a whole number of {CHANNELS}-channel pixels",
                samples.len()
            ),
        ));
    }
    Ok((samples.len() / CHANNELS, size_of_val(samples)))
}

fn check_active_channels<const CHANNELS: usize>(active: usize) -> Result<()> {
    if active == 0 || active > CHANNELS {
        return Err(Error::invalid(
            "histograms",
            format!("{active} active channels, expected 1 to {CHANNELS}"),
        ));
    }
    Ok(())
}

fn check_channel_args(arg: &'static str, len: usize, active: usize) -> Result<()> {
    if len != active {
        return Err(Error::invalid(
            arg,
            format!("{len} values for {active} active channels"),
        ));
    }
    Ok(())
}

// =============================================================================
// Free functions on the default configuration
// =============================================================================

/// [`DeviceHistogram::histogram_even`] with the default configuration.
#[allow(clippy::too_many_arguments)]
pub fn histogram_even<S, C, L>(
    storage: Option<&mut [u8]>,
    storage_size: &mut usize,
    samples: &[S],
    histogram: &mut [C],
    levels: u32,
    lower: L,
    upper: L,
) -> Result<()>
where
    S: Copy + Send + Sync + Into<L>,
    C: Counter,
    L: Level,
{
    DeviceHistogram::default().histogram_even(
        storage,
        storage_size,
        samples,
        histogram,
        levels,
        lower,
        upper,
    )
}

/// [`DeviceHistogram::histogram_even_2d`] with the default configuration.
#[allow(clippy::too_many_arguments)]
pub fn histogram_even_2d<S, C, L>(
    storage: Option<&mut [u8]>,
    storage_size: &mut usize,
    samples: &[S],
    columns: usize,
    rows: usize,
    row_stride_bytes: usize,
    histogram: &mut [C],
    levels: u32,
    lower: L,
    upper: L,
) -> Result<()>
where
    S: Copy + Send + Sync + Into<L>,
    C: Counter,
    L: Level,
{
    DeviceHistogram::default().histogram_even_2d(
        storage,
        storage_size,
        samples,
        columns,
        rows,
        row_stride_bytes,
        histogram,
        levels,
        lower,
        upper,
    )
}

/// [`DeviceHistogram::multi_histogram_even`] with the default configuration.
#[allow(clippy::too_many_arguments)]
pub fn multi_histogram_even<const CHANNELS: usize, S, C, L>(
    storage: Option<&mut [u8]>,
    storage_size: &mut usize,
    samples: &[S],
    histograms: &mut [&mut [C]],
    levels: &[u32],
    lower: &[L],
    upper: &[L],
) -> Result<()>
where
    S: Copy + Send + Sync + Into<L>,
    C: Counter,
    L: Level,
{
    DeviceHistogram::default().multi_histogram_even::<CHANNELS, S, C, L>(
        storage,
        storage_size,
        samples,
        histograms,
        levels,
        lower,
        upper,
    )
}

/// [`DeviceHistogram::multi_histogram_even_2d`] with the default
/// configuration.
#[allow(clippy::too_many_arguments)]
pub fn multi_histogram_even_2d<const CHANNELS: usize, S, C, L>(
    storage: Option<&mut [u8]>,
    storage_size: &mut usize,
    samples: &[S],
    columns: usize,
    rows: usize,
    row_stride_bytes: usize,
    histograms: &mut [&mut [C]],
    levels: &[u32],
    lower: &[L],
    upper: &[L],
) -> Result<()>
where
    S: Copy + Send + Sync + Into<L>,
    C: Counter,
    L: Level,
{
    DeviceHistogram::default().multi_histogram_even_2d::<CHANNELS, S, C, L>(
        storage,
        storage_size,
        samples,
        columns,
        rows,
        row_stride_bytes,
        histograms,
        levels,
        lower,
        upper,
    )
}

/// [`DeviceHistogram::histogram_range`] with the default configuration.
pub fn histogram_range<S, C, L>(
    storage: Option<&mut [u8]>,
    storage_size: &mut usize,
    samples: &[S],
    histogram: &mut [C],
    levels: &[L],
) -> Result<()>
where
    S: Copy + Send + Sync + Into<L>,
    C: Counter,
    L: Level,
{
    DeviceHistogram::default().histogram_range(storage, storage_size, samples, histogram, levels)
}

/// [`DeviceHistogram::histogram_range_2d`] with the default configuration.
#[allow(clippy::too_many_arguments)]
pub fn histogram_range_2d<S, C, L>(
    storage: Option<&mut [u8]>,
    storage_size: &mut usize,
    samples: &[S],
    columns: usize,
    rows: usize,
    row_stride_bytes: usize,
    histogram: &mut [C],
    levels: &[L],
) -> Result<()>
where
    S: Copy + Send + Sync + Into<L>,
    C: Counter,
    L: Level,
{
    DeviceHistogram::default().histogram_range_2d(
        storage,
        storage_size,
        samples,
        columns,
        rows,
        row_stride_bytes,
        histogram,
        levels,
    )
}

/// [`DeviceHistogram::multi_histogram_range`] with the default
/// configuration.
pub fn multi_histogram_range<const CHANNELS: usize, S, C, L>(
    storage: Option<&mut [u8]>,
    storage_size: &mut usize,
    samples: &[S],
    histograms: &mut [&mut [C]],
    levels: &[&[L]],
) -> Result<()>
where
    S: Copy + Send + Sync + Into<L>,
    C: Counter,
    L: Level,
{
    DeviceHistogram::default().multi_histogram_range::<CHANNELS, S, C, L>(
        storage,
        storage_size,
        samples,
        histograms,
        levels,
    )
}

/// [`DeviceHistogram::multi_histogram_range_2d`] with the default
/// configuration.
#[allow(clippy::too_many_arguments)]
pub fn multi_histogram_range_2d<const CHANNELS: usize, S, C, L>(
    storage: Option<&mut [u8]>,
    storage_size: &mut usize,
    samples: &[S],
    columns: usize,
    rows: usize,
    row_stride_bytes: usize,
    histograms: &mut [&mut [C]],
    levels: &[&[L]],
) -> Result<()>
where
    S: Copy + Send + Sync + Into<L>,
    C: Counter,
    L: Level,
{
    DeviceHistogram::default().multi_histogram_range_2d::<CHANNELS, S, C, L>(
        storage,
        storage_size,
        samples,
        columns,
        rows,
        row_stride_bytes,
        histograms,
        levels,
    )
}
