//! Integration tests for the device histogram.

use rstest::rstest;

use parprims::histogram::{
    self, DeviceHistogram, EvenBins, HistogramConfig, RangeBins, TEMPORARY_STORAGE_BYTES,
};
use parprims::testing::{
    extract_channel, extract_region, random_pixels_u8, random_samples_f32, random_samples_i32,
    reference_histogram,
};
use parprims::{Error, Verbosity};

const SAMPLES: [f32; 8] = [-10.0, 0.3, 9.5, 8.1, 1.5, 1.9, 100.0, 5.1];

/// RGBA pixels; the alpha channel is not histogrammed.
const RGBA: [u8; 32] = [
    3, 1, 5, 255, 3, 1, 5, 255, 4, 2, 6, 127, 3, 2, 6, 127, //
    0, 0, 0, 100, 0, 1, 0, 100, 0, 0, 1, 255, 0, 1, 1, 255,
];

const RGBA_RANGE: [u8; 32] = [
    0, 0, 80, 255, 120, 0, 80, 255, 123, 0, 82, 127, 10, 1, 83, 0, //
    51, 1, 8, 100, 52, 1, 8, 100, 53, 0, 81, 255, 54, 50, 81, 255,
];

fn device(shared_impl_max_bins: usize, n_threads: usize) -> DeviceHistogram {
    DeviceHistogram::new(
        HistogramConfig::builder()
            .block_size(32)
            .items_per_thread(4)
            .shared_impl_max_bins(shared_impl_max_bins)
            .n_threads(n_threads)
            .build()
            .unwrap(),
    )
}

/// Sizing call followed by the real call.
fn even_u32(
    device: &DeviceHistogram,
    samples: &[f32],
    levels: u32,
    lower: f32,
    upper: f32,
) -> Vec<u32> {
    let mut histogram = vec![0xDEAD_BEEF; levels as usize - 1];
    let mut size = 0;
    device
        .histogram_even(None, &mut size, samples, &mut histogram, levels, lower, upper)
        .unwrap();
    let mut storage = vec![0u8; size];
    device
        .histogram_even(Some(storage.as_mut_slice()), &mut size, samples, &mut histogram, levels, lower, upper)
        .unwrap();
    histogram
}

// =============================================================================
// Concrete scenarios
// =============================================================================

#[test]
fn even_scenario() {
    let mut histogram = [0u32; 5];
    let mut size = 0;
    histogram::histogram_even(None, &mut size, &SAMPLES, &mut histogram, 6, 0.0f32, 10.0).unwrap();
    let mut storage = vec![0u8; size];
    histogram::histogram_even(Some(storage.as_mut_slice()), &mut size, &SAMPLES, &mut histogram, 6, 0.0f32, 10.0)
        .unwrap();
    assert_eq!(histogram, [3, 0, 1, 0, 2]);
}

#[test]
fn range_scenario() {
    let levels = [0.0f32, 1.0, 5.0, 10.0, 20.0, 50.0];
    let mut histogram = [0i32; 5];
    let mut size = 0;
    histogram::histogram_range(None, &mut size, &SAMPLES, &mut histogram, &levels).unwrap();
    let mut storage = vec![0u8; size];
    histogram::histogram_range(Some(storage.as_mut_slice()), &mut size, &SAMPLES, &mut histogram, &levels)
        .unwrap();
    assert_eq!(histogram, [1, 2, 3, 0, 0]);
}

#[test]
fn even_2d_skips_row_padding() {
    // Two rows of 4 samples, rows 6 samples apart; padding would land in bin 2.
    let samples = [-10.0f32, 0.3, 9.5, 8.1, 5.0, 5.0, 1.5, 1.9, 100.0, 5.1, 5.0, 5.0];
    let mut histogram = [0u32; 5];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    histogram::histogram_even_2d(
        Some(storage.as_mut_slice()),
        &mut size,
        &samples,
        4,
        2,
        6 * size_of::<f32>(),
        &mut histogram,
        6,
        0.0f32,
        10.0,
    )
    .unwrap();
    assert_eq!(histogram, [3, 0, 1, 0, 2]);
}

#[test]
fn multi_even_rgba() {
    let mut r = vec![0i32; 256];
    let mut g = vec![0i32; 256];
    let mut b = vec![0i32; 256];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    histogram::multi_histogram_even::<4, _, _, _>(
        Some(storage.as_mut_slice()),
        &mut size,
        &RGBA,
        &mut [r.as_mut_slice(), g.as_mut_slice(), b.as_mut_slice()],
        &[257, 257, 257],
        &[0i32, 0, 0],
        &[256, 256, 256],
    )
    .unwrap();

    assert_eq!(&r[..8], &[4, 0, 0, 3, 1, 0, 0, 0]);
    assert_eq!(&g[..8], &[2, 4, 2, 0, 0, 0, 0, 0]);
    assert_eq!(&b[..8], &[2, 2, 0, 0, 0, 2, 2, 0]);
    assert!(r[8..].iter().chain(&g[8..]).chain(&b[8..]).all(|&c| c == 0));
}

#[test]
fn multi_range_rgba() {
    let levels: [&[i32]; 3] = [&[0, 50, 100, 200], &[0, 20, 40, 60], &[0, 10, 100]];
    let mut r = [0u32; 3];
    let mut g = [0u32; 3];
    let mut b = [0u32; 2];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    histogram::multi_histogram_range::<4, _, _, _>(
        Some(storage.as_mut_slice()),
        &mut size,
        &RGBA_RANGE,
        &mut [&mut r[..], &mut g[..], &mut b[..]],
        &levels,
    )
    .unwrap();

    assert_eq!(r, [2, 4, 2]);
    assert_eq!(g, [7, 0, 1]);
    assert_eq!(b, [2, 6]);
}

#[test]
fn multi_range_2d_rgba() {
    // 4 pixels per row, rows 5 pixels apart.
    let mut samples = Vec::new();
    samples.extend_from_slice(&RGBA_RANGE[..16]);
    samples.extend_from_slice(&[9, 9, 9, 9]);
    samples.extend_from_slice(&RGBA_RANGE[16..]);
    samples.extend_from_slice(&[9, 9, 9, 9]);

    let levels: [&[i32]; 3] = [&[0, 50, 100, 200], &[0, 20, 40, 60], &[0, 10, 100]];
    let mut r = [0u32; 3];
    let mut g = [0u32; 3];
    let mut b = [0u32; 2];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    histogram::multi_histogram_range_2d::<4, _, _, _>(
        Some(storage.as_mut_slice()),
        &mut size,
        &samples,
        4,
        2,
        20,
        &mut [&mut r[..], &mut g[..], &mut b[..]],
        &levels,
    )
    .unwrap();

    assert_eq!(r, [2, 4, 2]);
    assert_eq!(g, [7, 0, 1]);
    assert_eq!(b, [2, 6]);
}

// =============================================================================
// Storage sizing protocol
// =============================================================================

#[test]
fn sizing_is_idempotent_and_touches_nothing() {
    let mut histogram = [42u32; 5];
    let mut first = 0;
    let mut second = 0;
    histogram::histogram_even(None, &mut first, &SAMPLES, &mut histogram, 6, 0.0f32, 10.0).unwrap();
    histogram::histogram_even(None, &mut second, &SAMPLES, &mut histogram, 6, 0.0f32, 10.0).unwrap();

    assert_eq!(first, second);
    assert!(first > 0);
    assert_eq!(histogram, [42; 5]);
}

#[test]
fn short_storage_is_rejected() {
    let mut histogram = [42u32; 5];
    let mut storage = [0u8; 1];
    let mut size = 0;
    let err = histogram::histogram_even(
        Some(storage.as_mut_slice()),
        &mut size,
        &SAMPLES,
        &mut histogram,
        6,
        0.0f32,
        10.0,
    )
    .unwrap_err();

    assert_eq!(
        err,
        Error::AllocationTooSmall {
            required: TEMPORARY_STORAGE_BYTES,
            provided: 1
        }
    );
    assert_eq!(histogram, [42; 5]);
}

// =============================================================================
// Validation
// =============================================================================

fn invalid_arg(err: Error) -> &'static str {
    match err {
        Error::InvalidArgument { arg, .. } => arg,
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[rstest]
#[case(0)]
#[case(1)]
fn too_few_levels_fails_even_when_sizing(#[case] levels: u32) {
    let mut histogram = [0u32; 4];
    let mut size = 0;
    let err = histogram::histogram_even(None, &mut size, &SAMPLES, &mut histogram, levels, 0.0f32, 1.0)
        .unwrap_err();
    assert_eq!(invalid_arg(err), "levels");
    assert_eq!(size, 0);
}

#[test]
fn too_few_range_levels() {
    let mut histogram = [0u32; 4];
    let mut size = 0;
    let err = histogram::histogram_range(None, &mut size, &SAMPLES, &mut histogram, &[1.0f32])
        .unwrap_err();
    assert_eq!(invalid_arg(err), "levels");
}

#[test]
fn misaligned_row_stride() {
    let mut histogram = [0u32; 5];
    let mut size = 0;
    let err = histogram::histogram_even_2d(
        None,
        &mut size,
        &SAMPLES,
        2,
        2,
        10,
        &mut histogram,
        6,
        0.0f32,
        10.0,
    )
    .unwrap_err();
    assert_eq!(invalid_arg(err), "row_stride_bytes");
    assert_eq!(size, 0);
}

#[test]
fn region_must_fit_in_samples() {
    let mut histogram = [7u32; 5];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    // Row 1 would end at sample 6 + 4 = 10 > 8.
    let err = histogram::histogram_even_2d(
        Some(storage.as_mut_slice()),
        &mut size,
        &SAMPLES,
        4,
        2,
        6 * size_of::<f32>(),
        &mut histogram,
        6,
        0.0f32,
        10.0,
    )
    .unwrap_err();
    assert_eq!(invalid_arg(err), "samples");
    assert_eq!(histogram, [7; 5]);

    // Extent past usize::MAX.
    let mut counts = [7u32; 4];
    let err = histogram::histogram_even_2d(
        Some(storage.as_mut_slice()),
        &mut size,
        &[1u8; 8],
        4,
        usize::MAX / 2 + 2,
        usize::MAX / 2,
        &mut counts,
        5,
        0i32,
        8,
    )
    .unwrap_err();
    assert_eq!(invalid_arg(err), "samples");
    assert_eq!(counts, [7; 4]);
}

#[test]
fn output_must_hold_every_bin() {
    let mut histogram = [0u32; 4];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    let err = histogram::histogram_even(
        Some(storage.as_mut_slice()),
        &mut size,
        &SAMPLES,
        &mut histogram,
        6,
        0.0f32,
        10.0,
    )
    .unwrap_err();
    assert_eq!(invalid_arg(err), "histograms");
}

#[test]
fn active_channels_are_bounded_by_pixel_width() {
    let mut a = [0u32; 4];
    let mut b = [0u32; 4];
    let mut c = [0u32; 4];
    let mut size = 0;
    let err = histogram::multi_histogram_even::<2, u8, u32, i32>(
        None,
        &mut size,
        &[0; 8],
        &mut [&mut a[..], &mut b[..], &mut c[..]],
        &[5, 5, 5],
        &[0, 0, 0],
        &[4, 4, 4],
    )
    .unwrap_err();
    assert_eq!(invalid_arg(err), "histograms");

    let err = histogram::multi_histogram_even::<2, u8, u32, i32>(
        None,
        &mut size,
        &[0; 8],
        &mut [],
        &[],
        &[],
        &[],
    )
    .unwrap_err();
    assert_eq!(invalid_arg(err), "histograms");
}

#[test]
fn per_channel_arguments_must_match() {
    let mut a = [0u32; 4];
    let mut size = 0;
    let err = histogram::multi_histogram_even::<2, u8, u32, i32>(
        None,
        &mut size,
        &[0; 8],
        &mut [&mut a[..]],
        &[5],
        &[0, 0],
        &[4],
    )
    .unwrap_err();
    assert_eq!(invalid_arg(err), "lower");
}

#[test]
fn partial_pixels_are_rejected() {
    let mut a = [0u32; 4];
    let mut size = 0;
    let err = histogram::multi_histogram_even::<4, u8, u32, i32>(
        None,
        &mut size,
        &[0; 10],
        &mut [&mut a[..]],
        &[5],
        &[0],
        &[4],
    )
    .unwrap_err();
    assert_eq!(invalid_arg(err), "samples");
}

// =============================================================================
// Strategies
// =============================================================================

#[rstest]
#[case(1)]
#[case(4)]
fn privatized_and_global_agree(#[case] n_threads: usize) {
    let samples = random_samples_f32(10_000, 7, -1.0, 11.0);
    let privatized = even_u32(&device(1024, n_threads), &samples, 41, 0.0, 10.0);
    let global = even_u32(&device(0, n_threads), &samples, 41, 0.0, 10.0);
    assert_eq!(privatized, global);

    let mapper = EvenBins::new(41, 0.0f32, 10.0).unwrap();
    let expected: Vec<u32> = reference_histogram(&samples, &mapper)
        .into_iter()
        .map(|c| c as u32)
        .collect();
    assert_eq!(privatized, expected);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(1024)]
fn capped_grid_covers_every_tile(#[case] max_grid_size: usize) {
    let (columns, rows, row_stride) = (300, 9, 310);
    let samples = random_samples_i32(rows * row_stride, 11, 0, 99);
    let device = DeviceHistogram::new(
        HistogramConfig::builder()
            .block_size(16)
            .items_per_thread(2)
            .max_grid_size(max_grid_size)
            .build()
            .unwrap(),
    );

    let mut histogram = vec![0u64; 10];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    device
        .histogram_even_2d(
            Some(storage.as_mut_slice()),
            &mut size,
            &samples,
            columns,
            rows,
            row_stride * size_of::<i32>(),
            &mut histogram,
            11,
            0i32,
            100,
        )
        .unwrap();

    let region = extract_region(&samples, columns, rows, row_stride);
    let mapper = EvenBins::new(11, 0i32, 100).unwrap();
    assert_eq!(histogram, reference_histogram(&region, &mapper));
    assert_eq!(histogram.iter().sum::<u64>(), (columns * rows) as u64);
}

#[test]
fn many_bins_take_the_global_path() {
    // 3 x 1000 bins exceeds the default privatization threshold.
    let pixels = random_pixels_u8(5000, 3, 21);
    let mut hs = vec![vec![0usize; 1000]; 3];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    {
        let mut outputs: Vec<&mut [usize]> = hs.iter_mut().map(|h| h.as_mut_slice()).collect();
        histogram::multi_histogram_even::<3, _, _, _>(
            Some(storage.as_mut_slice()),
            &mut size,
            &pixels,
            &mut outputs,
            &[1001, 1001, 1001],
            &[0.0f64, 0.0, 0.0],
            &[256.0, 256.0, 256.0],
        )
        .unwrap();
    }
    for (channel, h) in hs.iter().enumerate() {
        let mapper = EvenBins::new(1001, 0.0f64, 256.0).unwrap();
        let expected = reference_histogram(&extract_channel(&pixels, 3, channel), &mapper);
        let got: Vec<u64> = h.iter().map(|&c| c as u64).collect();
        assert_eq!(got, expected);
    }
}

#[test]
fn counters_are_zeroed_before_counting() {
    let device = device(1024, 1);
    let first = even_u32(&device, &SAMPLES, 6, 0.0, 10.0);
    let second = even_u32(&device, &SAMPLES, 6, 0.0, 10.0);
    assert_eq!(first, second);
}

#[test]
fn debug_verbosity_does_not_change_results() {
    let device = DeviceHistogram::new(
        HistogramConfig::builder()
            .verbosity(Verbosity::Debug)
            .build()
            .unwrap(),
    );
    assert_eq!(even_u32(&device, &SAMPLES, 6, 0.0, 10.0), vec![3, 0, 1, 0, 2]);
}

#[test]
fn range_matches_even_on_implied_boundaries() {
    let samples = random_samples_i32(4000, 5, -20, 120);
    let boundaries: Vec<i32> = (0..=20).map(|j| j * 5).collect();

    let mut even = [0u32; 20];
    let mut range = [0u32; 20];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    let device = device(1024, 0);
    device
        .histogram_even(Some(storage.as_mut_slice()), &mut size, &samples, &mut even, 21, 0i32, 100)
        .unwrap();
    device
        .histogram_range(Some(storage.as_mut_slice()), &mut size, &samples, &mut range, &boundaries)
        .unwrap();
    assert_eq!(even, range);

    let mapper = RangeBins::new(&boundaries).unwrap();
    let expected: Vec<u32> = reference_histogram(&samples, &mapper)
        .into_iter()
        .map(|c| c as u32)
        .collect();
    assert_eq!(range.to_vec(), expected);
}

#[test]
fn range_matches_even_on_dyadic_float_boundaries() {
    let mut samples = random_samples_f32(4000, 9, -1.0, 9.0);
    samples.extend((0..=8).map(|j| j as f32));

    let mapper = EvenBins::new(9, 0.0f32, 8.0).unwrap();
    let boundaries: Vec<f32> = (0..=8).map(|j| j as f32).collect();
    let ranges = RangeBins::new(&boundaries).unwrap();
    assert_eq!(ranges.boundaries().first(), Some(&mapper.lower()));
    assert_eq!(ranges.boundaries().last(), Some(&mapper.upper()));

    let mut even = [0u32; 8];
    let mut range = [0u32; 8];
    let mut storage = [0u8; TEMPORARY_STORAGE_BYTES];
    let mut size = 0;
    let device = device(1024, 0);
    device
        .histogram_even(Some(storage.as_mut_slice()), &mut size, &samples, &mut even, 9, mapper.lower(), mapper.upper())
        .unwrap();
    device
        .histogram_range(Some(storage.as_mut_slice()), &mut size, &samples, &mut range, ranges.boundaries())
        .unwrap();
    assert_eq!(even, range);
    assert!(even.iter().all(|&c| c > 0));
}
