//! Test utilities: seeded sample generators and sequential references.
//!
//! Used by the crate's unit tests, integration tests and benches.

mod data;

pub use data::{random_i64, random_pixels_u8, random_samples_f32, random_samples_i32};

use crate::histogram::BinMapper;

/// Sequential inclusive scan.
pub fn reference_inclusive_scan<T: Copy>(input: &[T], op: impl Fn(T, T) -> T) -> Vec<T> {
    let mut out = Vec::with_capacity(input.len());
    let mut acc: Option<T> = None;
    for &x in input {
        let v = match acc {
            Some(a) => op(a, x),
            None => x,
        };
        out.push(v);
        acc = Some(v);
    }
    out
}

/// Sequential exclusive scan seeded with `init`.
pub fn reference_exclusive_scan<T: Copy>(input: &[T], init: T, op: impl Fn(T, T) -> T) -> Vec<T> {
    let mut out = Vec::with_capacity(input.len());
    let mut acc = init;
    for &x in input {
        out.push(acc);
        acc = op(acc, x);
    }
    out
}

/// Count `samples` one at a time through `mapper`.
pub fn reference_histogram<S: Copy>(samples: &[S], mapper: &impl BinMapper<S>) -> Vec<u64> {
    let mut counts = vec![0u64; mapper.bins()];
    for &s in samples {
        if let Some(bin) = mapper.bin(s) {
            counts[bin] += 1;
        }
    }
    counts
}

/// Channel `channel` of interleaved `channels`-sample pixels.
pub fn extract_channel<S: Copy>(samples: &[S], channels: usize, channel: usize) -> Vec<S> {
    assert!(channel < channels);
    samples.iter().skip(channel).step_by(channels).copied().collect()
}

/// Copy the `columns x rows` region out of a strided buffer, row by row.
pub fn extract_region<S: Copy>(samples: &[S], columns: usize, rows: usize, row_stride: usize) -> Vec<S> {
    (0..rows)
        .flat_map(|row| samples[row * row_stride..][..columns].iter().copied())
        .collect()
}
