//! Block-wide scan built from lockstep-group scans.
//!
//! # Algorithm
//!
//! ```text
//! lanes:    [g0: l0 .. l(w-1)] [g1: ...] ... [g(n-1): partial]
//!
//! 1. group scan       each group runs LockstepScan on its own lanes
//! 2. publish          last lane of group g writes its value to slot g
//!    ── sync_threads ──
//! 3. prefix scan      the first n lanes scan the n slots (inclusive)
//!    ── sync_threads ──
//! 4. combine          lanes of group g fold in slot g-1
//!                     (exclusive: then shift up one lane, lane 0 = prefix)
//! ```
//!
//! The last lane of a group is `min((g + 1) * w, block_size) - 1`, so a
//! final partial group still publishes its true reduction. A block with a
//! single group runs the same phases with an identity prefix.

use crate::error::{Error, Result};
use crate::grid::ThreadBlock;
use crate::warp::{LockstepScan, group_size_for_block, shuffle_up};

/// Block-scoped shared slots, one per group.
///
/// Acquire with [`BlockScan::storage`]. A storage may be reused across
/// calls on the same block shape; its contents never carry over.
#[derive(Debug, Clone)]
pub struct ScanStorage<T> {
    warp_prefixes: Vec<T>,
}

impl<T> ScanStorage<T> {
    fn with_warps(warps: usize) -> Self {
        Self {
            warp_prefixes: Vec::with_capacity(warps),
        }
    }

    /// Slots as left by the last scan: inclusive prefixes of the group
    /// reductions.
    pub fn slots(&self) -> &[T] {
        &self.warp_prefixes
    }
}

/// Block-wide inclusive and exclusive scans over `block_size` lanes.
///
/// Inputs and outputs are indexed by flat lane id. The `*_blocked`
/// variants give every lane `input.len() / block_size` consecutive items.
/// Every scan returns the block-wide reduction, i.e. the inclusive scan's
/// last value (never including an exclusive scan's `init`).
///
/// `op` must be associative. It is applied in flat lane order and never
/// assumed commutative.
///
/// # Example
///
/// ```
/// use parprims::block::BlockScan;
/// use parprims::warp::ShuffleScan;
///
/// let scan = BlockScan::new(7, ShuffleScan::new(4).unwrap()).unwrap();
/// let mut out = [0; 7];
/// let total = scan.inclusive_scan(&[1, 2, 3, 4, 5, 6, 7], &mut out, |a, b| a + b);
/// assert_eq!(out, [1, 3, 6, 10, 15, 21, 28]);
/// assert_eq!(total, 28);
/// ```
#[derive(Debug, Clone)]
pub struct BlockScan<W> {
    block_size: usize,
    warp_size: usize,
    warps: usize,
    lockstep: W,
}

impl<W: LockstepScan> BlockScan<W> {
    /// Build a scan for `block_size` lanes on top of `lockstep`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `block_size` is zero, or if the block has more
    /// groups than one lockstep group can scan.
    pub fn new(block_size: usize, lockstep: W) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::invalid("block_size", "must be at least 1"));
        }
        let warp_size = group_size_for_block(lockstep.width(), block_size);
        let warps = block_size.div_ceil(warp_size);
        if warps.next_power_of_two() > lockstep.width() {
            return Err(Error::invalid(
                "block_size",
                format!(
                    "{block_size} lanes need {warps} groups, more than one group of width {} can scan",
                    lockstep.width()
                ),
            ));
        }
        Ok(Self {
            block_size,
            warp_size,
            warps,
            lockstep,
        })
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Lanes per group.
    #[inline]
    pub fn group_size(&self) -> usize {
        self.warp_size
    }

    #[inline]
    pub fn warps_per_block(&self) -> usize {
        self.warps
    }

    /// Fresh shared slots for this block shape.
    pub fn storage<T>(&self) -> ScanStorage<T> {
        ScanStorage::with_warps(self.warps)
    }

    // =========================================================================
    // Scoped variants
    // =========================================================================

    /// `output[i] = input[0] op ... op input[i]`.
    pub fn inclusive_scan<T, F>(&self, input: &[T], output: &mut [T], op: F) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        let block = ThreadBlock::standalone(self.block_size);
        let mut storage = self.storage();
        self.inclusive_scan_in(&block, &mut storage, input, output, op)
    }

    /// `output[0] = init`, `output[i] = init op input[0] op ... op input[i-1]`.
    pub fn exclusive_scan<T, F>(&self, input: &[T], output: &mut [T], init: T, op: F) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        let block = ThreadBlock::standalone(self.block_size);
        let mut storage = self.storage();
        self.exclusive_scan_in(&block, &mut storage, input, output, init, op)
    }

    /// Exclusive scan without a seed. `output[0]` is unspecified; for
    /// `i >= 1`, `output[i] = input[0] op ... op input[i-1]`.
    pub fn exclusive_scan_unseeded<T, F>(&self, input: &[T], output: &mut [T], op: F) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        let block = ThreadBlock::standalone(self.block_size);
        let mut storage = self.storage();
        self.exclusive_scan_unseeded_in(&block, &mut storage, input, output, op)
    }

    /// Inclusive scan with several consecutive items per lane.
    pub fn inclusive_scan_blocked<T, F>(&self, input: &[T], output: &mut [T], op: F) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        let block = ThreadBlock::standalone(self.block_size);
        let mut storage = self.storage();
        self.inclusive_scan_blocked_in(&block, &mut storage, input, output, op)
    }

    /// Exclusive scan with several consecutive items per lane.
    pub fn exclusive_scan_blocked<T, F>(&self, input: &[T], output: &mut [T], init: T, op: F) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        let block = ThreadBlock::standalone(self.block_size);
        let mut storage = self.storage();
        self.exclusive_scan_blocked_in(&block, &mut storage, input, output, init, op)
    }

    // =========================================================================
    // Variants on caller-owned block context and storage
    // =========================================================================

    pub fn inclusive_scan_in<T, F>(
        &self,
        block: &ThreadBlock,
        storage: &mut ScanStorage<T>,
        input: &[T],
        output: &mut [T],
        op: F,
    ) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        self.check_shape(block, input.len(), output.len());
        self.group_scan(input, output, &op);
        self.calculate_warp_prefixes(block, storage, output, &op);

        let prefixes = storage.slots();
        for (warp_id, lanes) in output.chunks_mut(self.warp_size).enumerate().skip(1) {
            let warp_prefix = prefixes[warp_id - 1];
            for v in lanes.iter_mut() {
                *v = op(warp_prefix, *v);
            }
        }
        prefixes[self.warps - 1]
    }

    pub fn exclusive_scan_in<T, F>(
        &self,
        block: &ThreadBlock,
        storage: &mut ScanStorage<T>,
        input: &[T],
        output: &mut [T],
        init: T,
        op: F,
    ) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        self.check_shape(block, input.len(), output.len());
        self.group_scan(input, output, &op);
        self.calculate_warp_prefixes(block, storage, output, &op);

        let prefixes = storage.slots();
        for (warp_id, lanes) in output.chunks_mut(self.warp_size).enumerate() {
            let warp_prefix = if warp_id == 0 {
                init
            } else {
                op(init, prefixes[warp_id - 1])
            };
            for v in lanes.iter_mut() {
                *v = op(warp_prefix, *v);
            }
            shuffle_up(lanes, Some(warp_prefix));
        }
        prefixes[self.warps - 1]
    }

    pub fn exclusive_scan_unseeded_in<T, F>(
        &self,
        block: &ThreadBlock,
        storage: &mut ScanStorage<T>,
        input: &[T],
        output: &mut [T],
        op: F,
    ) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        self.check_shape(block, input.len(), output.len());
        self.group_scan(input, output, &op);
        self.calculate_warp_prefixes(block, storage, output, &op);

        let prefixes = storage.slots();
        for (warp_id, lanes) in output.chunks_mut(self.warp_size).enumerate() {
            let warp_prefix = (warp_id > 0).then(|| prefixes[warp_id - 1]);
            if let Some(p) = warp_prefix {
                for v in lanes.iter_mut() {
                    *v = op(p, *v);
                }
            }
            shuffle_up(lanes, warp_prefix);
        }
        prefixes[self.warps - 1]
    }

    pub fn inclusive_scan_blocked_in<T, F>(
        &self,
        block: &ThreadBlock,
        storage: &mut ScanStorage<T>,
        input: &[T],
        output: &mut [T],
        op: F,
    ) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        let items = self.items_per_thread(input.len(), output.len());
        let thread_reductions = thread_reduce(input, items, &op);
        let mut thread_prefixes = thread_reductions.clone();
        let reduction = self.exclusive_scan_unseeded_in(
            block,
            storage,
            &thread_reductions,
            &mut thread_prefixes,
            &op,
        );

        for (lane, (inp, out)) in input
            .chunks_exact(items)
            .zip(output.chunks_exact_mut(items))
            .enumerate()
        {
            // Lane 0 has no prefix.
            out[0] = if lane == 0 {
                inp[0]
            } else {
                op(thread_prefixes[lane], inp[0])
            };
            for i in 1..items {
                out[i] = op(out[i - 1], inp[i]);
            }
        }
        reduction
    }

    pub fn exclusive_scan_blocked_in<T, F>(
        &self,
        block: &ThreadBlock,
        storage: &mut ScanStorage<T>,
        input: &[T],
        output: &mut [T],
        init: T,
        op: F,
    ) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        let items = self.items_per_thread(input.len(), output.len());
        let thread_reductions = thread_reduce(input, items, &op);
        let mut thread_prefixes = thread_reductions.clone();
        let reduction = self.exclusive_scan_in(
            block,
            storage,
            &thread_reductions,
            &mut thread_prefixes,
            init,
            &op,
        );

        for ((inp, out), &prefix) in input
            .chunks_exact(items)
            .zip(output.chunks_exact_mut(items))
            .zip(&thread_prefixes)
        {
            out[0] = prefix;
            for i in 1..items {
                out[i] = op(out[i - 1], inp[i - 1]);
            }
        }
        reduction
    }

    // =========================================================================
    // Phases
    // =========================================================================

    /// Phase 1: each group scans its own lanes.
    fn group_scan<T, F>(&self, input: &[T], output: &mut [T], op: &F)
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        output.copy_from_slice(input);
        for lanes in output.chunks_mut(self.warp_size) {
            self.lockstep.inclusive_scan(lanes, op);
        }
    }

    /// Phases 2 and 3: leave the inclusive prefix of group reductions
    /// `0..=g` in slot `g`.
    fn calculate_warp_prefixes<T, F>(
        &self,
        block: &ThreadBlock,
        storage: &mut ScanStorage<T>,
        inclusive: &[T],
        op: &F,
    ) where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        let slots = &mut storage.warp_prefixes;
        slots.clear();
        block.for_each_lane(|flat_id| {
            let warp_id = flat_id / self.warp_size;
            if flat_id == ((warp_id + 1) * self.warp_size).min(self.block_size) - 1 {
                slots.push(inclusive[flat_id]);
            }
        });
        debug_assert_eq!(slots.len(), self.warps);
        block.sync_threads();

        self.lockstep.inclusive_scan(&mut slots[..self.warps], op);
        block.sync_threads();
    }

    fn check_shape(&self, block: &ThreadBlock, input_len: usize, output_len: usize) {
        assert_eq!(block.size(), self.block_size, "block size mismatch");
        assert_eq!(input_len, self.block_size, "input must hold one value per lane");
        assert_eq!(output_len, self.block_size, "output must hold one value per lane");
    }

    fn items_per_thread(&self, input_len: usize, output_len: usize) -> usize {
        assert_eq!(input_len, output_len, "input and output lengths differ");
        assert!(
            input_len >= self.block_size && input_len % self.block_size == 0,
            "input length {input_len} is not a positive multiple of block size {}",
            self.block_size
        );
        input_len / self.block_size
    }
}

/// Fold each lane's items into one value.
fn thread_reduce<T, F>(input: &[T], items: usize, op: &F) -> Vec<T>
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    input
        .chunks_exact(items)
        .map(|chunk| chunk[1..].iter().fold(chunk[0], |acc, &x| op(acc, x)))
        .collect()
}
