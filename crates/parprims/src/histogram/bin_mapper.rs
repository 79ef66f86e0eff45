//! Sample-to-bin mapping.
//!
//! A [`BinMapper`] is built once per channel before a grid launches and is
//! then shared read-only by every lane. Samples that fall outside the
//! mapper's range (or compare unordered, like NaN) map to `None` and are
//! not counted.

use std::fmt::Debug;

use crate::error::{Error, Result};

/// Maps one sample to a bin of one channel.
pub trait BinMapper<S>: Send + Sync {
    /// Number of bins (`levels - 1`).
    fn bins(&self) -> usize;

    /// Bin of `sample`, or `None` when it is out of range.
    fn bin(&self, sample: S) -> Option<usize>;
}

/// Types usable as bin boundaries.
pub trait Level: Copy + PartialOrd + Send + Sync + Debug + 'static {
    /// Equal-width bin of `sample` in `[lower, upper)` split into `bins`
    /// bins. Callers guarantee `lower <= sample < upper`.
    fn even_bin(sample: Self, lower: Self, upper: Self, bins: usize) -> usize;
}

macro_rules! impl_float_level {
    ($($t:ty),*) => {$(
        impl Level for $t {
            #[inline]
            fn even_bin(sample: Self, lower: Self, upper: Self, bins: usize) -> usize {
                let scaled = (sample - lower) / (upper - lower) * bins as $t;
                // Rounding can push a sample just below `upper` onto `bins`.
                (scaled as usize).min(bins - 1)
            }
        }
    )*};
}

macro_rules! impl_int_level {
    ($($t:ty),*) => {$(
        impl Level for $t {
            #[inline]
            fn even_bin(sample: Self, lower: Self, upper: Self, bins: usize) -> usize {
                let offset = sample as i128 - lower as i128;
                let width = upper as i128 - lower as i128;
                ((offset * bins as i128 / width) as usize).min(bins - 1)
            }
        }
    )*};
}

impl_float_level!(f32, f64);
impl_int_level!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

fn bins_from_levels(levels: usize) -> Result<usize> {
    if levels < 2 {
        return Err(Error::invalid(
            "levels",
            format!("must be at least 2, got {levels}"),
        ));
    }
    Ok(levels - 1)
}

// =============================================================================
// Even
// =============================================================================

/// `levels - 1` equal-width bins over `[lower, upper)`.
///
/// Float bins are computed by scaling, not by comparing against boundary
/// values, so a sample sitting on an inner boundary agrees bin for bin with
/// [`RangeBins`] only when the boundaries are exactly representable (for
/// example a power-of-two bin count over a power-of-two width). Integer
/// levels are exact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvenBins<L> {
    bins: usize,
    lower: L,
    upper: L,
}

impl<L: Level> EvenBins<L> {
    /// # Errors
    ///
    /// `InvalidArgument` when `levels < 2`.
    pub fn new(levels: u32, lower: L, upper: L) -> Result<Self> {
        let bins = bins_from_levels(levels as usize)?;
        Ok(Self { bins, lower, upper })
    }

    pub fn lower(&self) -> L {
        self.lower
    }

    pub fn upper(&self) -> L {
        self.upper
    }
}

impl<S, L> BinMapper<S> for EvenBins<L>
where
    S: Copy + Into<L>,
    L: Level,
{
    #[inline]
    fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    fn bin(&self, sample: S) -> Option<usize> {
        let s: L = sample.into();
        if s >= self.lower && s < self.upper {
            Some(L::even_bin(s, self.lower, self.upper, self.bins))
        } else {
            None
        }
    }
}

// =============================================================================
// Range
// =============================================================================

/// Bins bounded by an explicit sorted boundary array: bin `j` is
/// `[boundaries[j], boundaries[j + 1])`.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeBins<L> {
    boundaries: Box<[L]>,
}

impl<L: Level> RangeBins<L> {
    /// # Errors
    ///
    /// `InvalidArgument` when fewer than 2 boundaries are given or they are
    /// not sorted ascending.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn new(boundaries: &[L]) -> Result<Self> {
        bins_from_levels(boundaries.len())?;
        if let Some(i) = boundaries.windows(2).position(|w| !(w[0] <= w[1])) {
            return Err(Error::invalid(
                "levels",
                format!(
                    "boundaries must be sorted ascending, {:?} precedes {:?}",
                    boundaries[i],
                    boundaries[i + 1]
                ),
            ));
        }
        Ok(Self {
            boundaries: boundaries.into(),
        })
    }

    pub fn boundaries(&self) -> &[L] {
        &self.boundaries
    }
}

impl<S, L> BinMapper<S> for RangeBins<L>
where
    S: Copy + Into<L>,
    L: Level,
{
    #[inline]
    fn bins(&self) -> usize {
        self.boundaries.len() - 1
    }

    #[inline]
    fn bin(&self, sample: S) -> Option<usize> {
        let s: L = sample.into();
        // Upper bound: first boundary strictly greater than the sample.
        let idx = self.boundaries.partition_point(|b| *b <= s);
        if idx == 0 || idx == self.boundaries.len() {
            None
        } else {
            Some(idx - 1)
        }
    }
}
