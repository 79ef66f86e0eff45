//! Grid and block execution model.
//!
//! A grid is a 2-D array of blocks; a block is `size` lanes that cooperate
//! through block-scoped storage and barriers. Blocks never talk to each
//! other except through global memory (atomics).
//!
//! # Execution
//!
//! ```text
//! launch(grid) ──► block (0,0) ─┐
//!                  block (1,0) ─┼──► rayon tasks (or sequential)
//!                  ...          │
//!                  block (x,y) ─┘
//! ```
//!
//! Inside a block, lanes run in phase order on the task that owns the
//! block: every lane finishes the current phase before any lane starts the
//! next one, and [`ThreadBlock::sync_threads`] marks the phase boundary.
//! That is exactly the guarantee a hardware barrier gives, so kernels are
//! written as "for each lane, do phase k; barrier; ...".

use std::cell::Cell;
use std::ops::Range;

use crate::utils::Parallelism;

/// Grid dimensions in blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDim {
    pub x: usize,
    pub y: usize,
}

impl GridDim {
    pub fn linear(x: usize) -> Self {
        Self { x, y: 1 }
    }

    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Total number of blocks.
    #[inline]
    pub fn blocks(&self) -> usize {
        self.x * self.y
    }
}

/// Position of a block within its grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockIdx {
    pub x: usize,
    pub y: usize,
}

/// Execution context of one block.
///
/// Lives for exactly one block invocation.
#[derive(Debug)]
pub struct ThreadBlock {
    idx: BlockIdx,
    grid: GridDim,
    size: usize,
    barriers: Cell<usize>,
}

impl ThreadBlock {
    pub fn new(idx: BlockIdx, grid: GridDim, size: usize) -> Self {
        Self {
            idx,
            grid,
            size,
            barriers: Cell::new(0),
        }
    }

    /// A lone block, for block-level algorithms called outside a grid.
    pub fn standalone(size: usize) -> Self {
        Self::new(BlockIdx { x: 0, y: 0 }, GridDim::linear(1), size)
    }

    #[inline]
    pub fn idx(&self) -> BlockIdx {
        self.idx
    }

    #[inline]
    pub fn grid(&self) -> GridDim {
        self.grid
    }

    /// Number of lanes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flat lane ids, `0..size`.
    #[inline]
    pub fn lanes(&self) -> Range<usize> {
        0..self.size
    }

    /// Run one phase: `f(lane)` for every lane in flat order.
    #[inline]
    pub fn for_each_lane(&self, f: impl FnMut(usize)) {
        self.lanes().for_each(f);
    }

    /// Full-block barrier.
    ///
    /// All block-scoped writes made before the barrier are visible to every
    /// lane after it.
    #[inline]
    pub fn sync_threads(&self) {
        self.barriers.set(self.barriers.get() + 1);
    }

    /// Barriers passed so far by this block.
    #[inline]
    pub fn barrier_count(&self) -> usize {
        self.barriers.get()
    }
}

/// Dispatch `kernel` once per block of `grid`.
///
/// Blocks are independent tasks; with [`Parallelism::Parallel`] they run on
/// the current rayon pool. An empty grid launches nothing.
pub fn launch<K>(grid: GridDim, block_size: usize, parallelism: Parallelism, kernel: K)
where
    K: Fn(&ThreadBlock) + Sync + Send,
{
    if grid.blocks() == 0 || block_size == 0 {
        return;
    }
    parallelism.maybe_par_for_each(0..grid.blocks(), |flat| {
        let idx = BlockIdx {
            x: flat % grid.x,
            y: flat / grid.x,
        };
        let block = ThreadBlock::new(idx, grid, block_size);
        kernel(&block);
    });
}
