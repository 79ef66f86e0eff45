use rand::prelude::*;

/// Uniform samples in `[min, max)`.
pub fn random_samples_f32(n: usize, seed: u64, min: f32, max: f32) -> Vec<f32> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    (0..n).map(|_| min + rng.r#gen::<f32>() * width).collect()
}

/// Uniform integer samples in `[min, max]`.
pub fn random_samples_i32(n: usize, seed: u64, min: i32, max: i32) -> Vec<i32> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(min..=max)).collect()
}

/// `pixels` interleaved pixels of `channels` random bytes each.
pub fn random_pixels_u8(pixels: usize, channels: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..pixels * channels).map(|_| rng.r#gen::<u8>()).collect()
}

/// Small signed values, for scans whose sums must not overflow.
pub fn random_i64(n: usize, seed: u64) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1000..=1000)).collect()
}
