//! Intensity statistics: standard deviation, histograms, range bandwidth.
//!
//! The range bandwidth estimator scales with image contrast: textured or
//! noisy images get a wider range kernel, flat images fall back to a floor.

use ndarray::ArrayView3;

use super::core::INTENSITY_LEVELS;
use crate::config::{ensure_range_floor, DEFAULT_MIN_RANGE_SIGMA};
use crate::error::{ensure_non_empty, FilterError, FilterResult};

/// Population standard deviation of every sample in the buffer.
pub fn intensity_std_dev(input: ArrayView3<u8>) -> FilterResult<f64> {
    ensure_non_empty(input.dim())?;

    let count = input.len() as f64;
    let mean = input.iter().map(|&v| v as f64).sum::<f64>() / count;
    let variance = input
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count;

    Ok(variance.sqrt())
}

/// Range bandwidth for a single-channel buffer: `max(round(std_dev), 10)`.
///
/// # Arguments
/// * `input` - Intensity buffer (height, width, 1)
///
/// # Errors
/// `EmptyInput` for a zero-size buffer, `ShapeMismatch` for more than one channel
pub fn estimate_range_bandwidth(input: ArrayView3<u8>) -> FilterResult<f32> {
    estimate_range_bandwidth_with_floor(input, DEFAULT_MIN_RANGE_SIGMA)
}

/// Same as `estimate_range_bandwidth` with a caller-chosen floor.
///
/// The floor itself must be at least 10.
pub fn estimate_range_bandwidth_with_floor(
    input: ArrayView3<u8>,
    min_sigma: f32,
) -> FilterResult<f32> {
    ensure_range_floor(min_sigma)?;
    ensure_non_empty(input.dim())?;
    let channels = input.dim().2;
    if channels != 1 {
        return Err(FilterError::ShapeMismatch {
            expected: "1 intensity channel",
            actual: channels,
        });
    }

    let std_dev = intensity_std_dev(input)?.round() as f32;
    Ok(std_dev.max(min_sigma))
}

/// Count of each 8-bit value on one channel.
pub fn channel_histogram(
    input: ArrayView3<u8>,
    channel: usize,
) -> FilterResult<[u64; INTENSITY_LEVELS]> {
    ensure_non_empty(input.dim())?;
    let channels = input.dim().2;
    if channel >= channels {
        return Err(FilterError::InvalidParameter(format!(
            "channel {channel} out of range for {channels}-channel image"
        )));
    }

    let mut hist = [0u64; INTENSITY_LEVELS];
    for row in input.outer_iter() {
        for pixel in row.outer_iter() {
            hist[pixel[channel] as usize] += 1;
        }
    }
    Ok(hist)
}

/// Histograms for every channel, in channel order.
pub fn histograms(input: ArrayView3<u8>) -> FilterResult<Vec<[u64; INTENSITY_LEVELS]>> {
    (0..input.dim().2)
        .map(|c| channel_histogram(input, c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_constant_buffer_returns_floor() {
        let img = Array3::<u8>::from_elem((6, 6, 1), 200);
        assert_eq!(estimate_range_bandwidth(img.view()).unwrap(), 10.0);
    }

    #[test]
    fn test_high_contrast_uses_std_dev() {
        // Half 0, half 255: population std dev is 127.5 -> rounds to 128
        let img = Array3::from_shape_fn((4, 4, 1), |(_, x, _)| if x < 2 { 0 } else { 255 });
        let sigma = estimate_range_bandwidth(img.view()).unwrap();
        assert_eq!(sigma, 128.0);
    }

    #[test]
    fn test_low_contrast_clamped_to_floor() {
        let img = Array3::from_shape_fn((4, 4, 1), |(y, x, _)| 100 + ((x + y) % 3) as u8);
        assert_eq!(estimate_range_bandwidth(img.view()).unwrap(), 10.0);
    }

    #[test]
    fn test_custom_floor() {
        let img = Array3::<u8>::from_elem((3, 3, 1), 7);
        assert_eq!(
            estimate_range_bandwidth_with_floor(img.view(), 25.0).unwrap(),
            25.0
        );
        assert!(estimate_range_bandwidth_with_floor(img.view(), 0.0).is_err());
        assert!(matches!(
            estimate_range_bandwidth_with_floor(img.view(), 4.0),
            Err(FilterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_std_dev_population() {
        let img = Array3::from_shape_vec((1, 4, 1), vec![2u8, 4, 4, 6]).unwrap();
        // mean 4, squared deviations 4 + 0 + 0 + 4 over 4 samples
        assert!((intensity_std_dev(img.view()).unwrap() - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_estimator_errors() {
        let empty = Array3::<u8>::zeros((0, 0, 1));
        assert!(matches!(
            estimate_range_bandwidth(empty.view()),
            Err(FilterError::EmptyInput { .. })
        ));

        let color = Array3::<u8>::zeros((2, 2, 3));
        assert!(matches!(
            estimate_range_bandwidth(color.view()),
            Err(FilterError::ShapeMismatch { actual: 3, .. })
        ));
    }

    #[test]
    fn test_histograms() {
        let mut img = Array3::<u8>::zeros((2, 3, 2));
        img[[0, 0, 0]] = 255;
        img[[1, 2, 1]] = 10;

        let hists = histograms(img.view()).unwrap();
        assert_eq!(hists.len(), 2);
        assert_eq!(hists[0][255], 1);
        assert_eq!(hists[0][0], 5);
        assert_eq!(hists[1][10], 1);
        assert_eq!(hists[1].iter().sum::<u64>(), 6);

        assert!(channel_histogram(img.view(), 2).is_err());
    }
}
