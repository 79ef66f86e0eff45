//! Histogram grid kernels.
//!
//! Three kernels run over one [`HistogramPass`]:
//!
//! - [`init`](HistogramPass::init) zeroes every active channel's counters;
//! - [`shared`](HistogramPass::shared) accumulates into block-local
//!   counters and flushes them to the global counters (privatized);
//! - [`global`](HistogramPass::global) adds straight into the global
//!   counters.
//!
//! Samples are interleaved pixels of `CHANNELS` values. Pixel `(col, row)`
//! starts at `row * row_stride + col * CHANNELS`; only the first
//! `mappers.len()` channels of each pixel are counted.

use std::sync::atomic::{AtomicU32, Ordering};

use super::bin_mapper::BinMapper;
use super::counter::Counter;
use crate::grid::ThreadBlock;

/// Sample region in pixels; `row_stride` is in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Region {
    pub columns: usize,
    pub rows: usize,
    pub row_stride: usize,
}

/// Everything one histogram dispatch reads or updates.
pub(crate) struct HistogramPass<'a, const CHANNELS: usize, S, C: Counter, M> {
    pub samples: &'a [S],
    pub region: Region,
    /// One counter slice per active channel, each exactly `bins` long.
    pub histograms: &'a [&'a [C::Atomic]],
    pub mappers: &'a [M],
    pub items_per_thread: usize,
}

impl<const CHANNELS: usize, S, C, M> HistogramPass<'_, CHANNELS, S, C, M>
where
    S: Copy + Send + Sync,
    C: Counter,
    M: BinMapper<S>,
{
    #[inline]
    fn pixel(&self, row: usize, col: usize) -> &[S] {
        let start = row * self.region.row_stride + col * CHANNELS;
        &self.samples[start..start + CHANNELS]
    }

    /// Zero counters `[idx.x * block_size, (idx.x + 1) * block_size)` of
    /// every channel that has them.
    pub fn init(&self, block: &ThreadBlock) {
        let block_offset = block.idx().x * block.size();
        block.for_each_lane(|lane| {
            let index = block_offset + lane;
            for counters in self.histograms {
                if index < counters.len() {
                    C::atomic_reset(&counters[index]);
                }
            }
        });
    }

    /// Privatized accumulation.
    ///
    /// The block walks rows `idx.y, idx.y + grid.y, ...` and, within each
    /// row, column tiles `idx.x, idx.x + grid.x, ...`. Counts go to a
    /// block-local `AtomicU32` array laid out channel after channel, which
    /// is flushed to the global counters at the end.
    pub fn shared(&self, block: &ThreadBlock) {
        let block_size = block.size();
        let items_per_block = block_size * self.items_per_thread;
        let idx = block.idx();
        let grid = block.grid();

        let mut offsets = Vec::with_capacity(self.mappers.len());
        let mut total_bins = 0;
        for mapper in self.mappers {
            offsets.push(total_bins);
            total_bins += mapper.bins();
        }

        let block_histogram: Box<[AtomicU32]> =
            (0..total_bins).map(|_| AtomicU32::new(0)).collect();
        block.sync_threads();

        let Region { columns, rows, .. } = self.region;
        for row in (idx.y..rows).step_by(grid.y) {
            for block_offset in (idx.x * items_per_block..columns).step_by(grid.x * items_per_block) {
                block.for_each_lane(|lane| {
                    for i in 0..self.items_per_thread {
                        let col = block_offset + i * block_size + lane;
                        if col >= columns {
                            break;
                        }
                        let pixel = self.pixel(row, col);
                        for (channel, mapper) in self.mappers.iter().enumerate() {
                            if let Some(bin) = mapper.bin(pixel[channel]) {
                                block_histogram[offsets[channel] + bin]
                                    .fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
        }
        block.sync_threads();

        block.for_each_lane(|lane| {
            for (channel, counters) in self.histograms.iter().enumerate() {
                let local = &block_histogram[offsets[channel]..][..counters.len()];
                for bin in (lane..counters.len()).step_by(block_size) {
                    let count = local[bin].load(Ordering::Relaxed);
                    if count > 0 {
                        C::atomic_add(&counters[bin], count);
                    }
                }
            }
        });
    }

    /// Direct accumulation: block `(x, y)` covers tile `x` of row `y`.
    pub fn global(&self, block: &ThreadBlock) {
        let block_size = block.size();
        let idx = block.idx();
        let row = idx.y;
        let block_offset = idx.x * block_size * self.items_per_thread;
        let columns = self.region.columns;

        block.for_each_lane(|lane| {
            for i in 0..self.items_per_thread {
                let col = block_offset + i * block_size + lane;
                if col >= columns {
                    break;
                }
                let pixel = self.pixel(row, col);
                for (channel, mapper) in self.mappers.iter().enumerate() {
                    if let Some(bin) = mapper.bin(pixel[channel]) {
                        C::atomic_add(&self.histograms[channel][bin], 1);
                    }
                }
            }
        });
    }
}
