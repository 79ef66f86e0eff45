//! Lockstep-group ("warp") scan capability.
//!
//! A lockstep group is a power-of-two set of lanes that execute together.
//! Group-wide primitives therefore see all of the group's lane values at
//! once: here they are a slice indexed by lane id, and the primitive
//! completes before returning, which is all the synchronization a group
//! needs.
//!
//! [`LockstepScan`] is the only group primitive the block algorithms depend
//! on. It is injected as a capability so block code never assumes a
//! particular hardware width.

use crate::error::{Error, Result};

/// Native lockstep width of the target hardware (an AMD wavefront).
pub const HARDWARE_WARP_SIZE: usize = 64;

/// Inclusive scan within one lockstep group.
pub trait LockstepScan: Send + Sync {
    /// Native width of one group. Always a power of two.
    fn width(&self) -> usize;

    /// Replace `lanes[i]` with `op(lanes[0], ..., lanes[i])`.
    ///
    /// `lanes.len()` may be anything up to [`width`](Self::width); a
    /// shorter slice is a logical group of that many lanes. `op` must be
    /// associative; it is never assumed commutative.
    fn inclusive_scan<T, F>(&self, lanes: &mut [T], op: &F)
    where
        T: Copy,
        F: Fn(T, T) -> T;
}

fn check_width(width: usize) -> Result<()> {
    if width == 0 || !width.is_power_of_two() {
        return Err(Error::invalid(
            "width",
            format!("lockstep width must be a non-zero power of two, got {width}"),
        ));
    }
    Ok(())
}

/// Shuffle-up (Kogge-Stone) scan: `log2(n)` steps, each lane combining
/// with the lane `offset` below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShuffleScan {
    width: usize,
}

impl ShuffleScan {
    pub fn new(width: usize) -> Result<Self> {
        check_width(width)?;
        Ok(Self { width })
    }

    /// Scan at [`HARDWARE_WARP_SIZE`].
    pub fn native() -> Self {
        Self {
            width: HARDWARE_WARP_SIZE,
        }
    }
}

impl Default for ShuffleScan {
    fn default() -> Self {
        Self::native()
    }
}

impl LockstepScan for ShuffleScan {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn inclusive_scan<T, F>(&self, lanes: &mut [T], op: &F)
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        debug_assert!(lanes.len() <= self.width);
        let n = lanes.len();
        let mut offset = 1;
        while offset < n {
            // Walking down keeps every read on a value from the previous step.
            for lane in (offset..n).rev() {
                lanes[lane] = op(lanes[lane - offset], lanes[lane]);
            }
            offset <<= 1;
        }
    }
}

/// Lane-by-lane running fold. Same contract as [`ShuffleScan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerialScan {
    width: usize,
}

impl SerialScan {
    pub fn new(width: usize) -> Result<Self> {
        check_width(width)?;
        Ok(Self { width })
    }
}

impl LockstepScan for SerialScan {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn inclusive_scan<T, F>(&self, lanes: &mut [T], op: &F)
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        debug_assert!(lanes.len() <= self.width);
        for lane in 1..lanes.len() {
            lanes[lane] = op(lanes[lane - 1], lanes[lane]);
        }
    }
}

/// Group size used for a block: the native width, or the smallest power of
/// two covering the block when the block is narrower than that.
#[inline]
pub fn group_size_for_block(width: usize, block_size: usize) -> usize {
    width.min(block_size.next_power_of_two())
}

/// Shift lane values up by one lane within a group and seed lane 0.
///
/// Lane `k` receives lane `k - 1`'s value. With `lane0 == None` lane 0
/// keeps whatever it held.
#[inline]
pub fn shuffle_up<T: Copy>(lanes: &mut [T], lane0: Option<T>) {
    if lanes.is_empty() {
        return;
    }
    lanes.copy_within(..lanes.len() - 1, 1);
    if let Some(v) = lane0 {
        lanes[0] = v;
    }
}
