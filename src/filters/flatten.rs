//! Channel-selective flattening.
//!
//! Grayscale input is filtered directly. Color input is split into a
//! luminance plane and chroma planes by a `LumaChromaSplit` collaborator;
//! only the luminance plane goes through the bilateral filter, and the
//! chroma planes are merged back untouched.
//!
//! The range bandwidth is estimated from the luminance plane of each image
//! unless the configuration fixes one.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;
use tracing::{info, warn};

use super::bilateral::iterate_with_tables;
use super::color_space::{CieLab, LumaChromaSplit};
use super::core::BilateralTables;
use super::statistics::estimate_range_bandwidth_with_floor;
use crate::config::FlattenConfig;
use crate::error::{ensure_non_empty, FilterResult};

/// Range bandwidth for one luminance plane, never below the configured floor.
fn resolve_range_sigma(luma: ArrayView3<u8>, config: &FlattenConfig) -> FilterResult<f32> {
    match config.range_sigma {
        Some(sigma_r) => Ok(sigma_r.max(config.min_range_sigma)),
        None => estimate_range_bandwidth_with_floor(luma, config.min_range_sigma),
    }
}

/// Estimate, build tables, and run every configured pass on one plane.
fn flatten_plane(plane: ArrayView3<u8>, config: &FlattenConfig) -> FilterResult<Array3<u8>> {
    let sigma_r = resolve_range_sigma(plane, config)?;
    let tables =
        BilateralTables::new(config.sigma_d, sigma_r)?.with_alignment(config.alignment);

    let (height, width, _) = plane.dim();
    info!(
        height,
        width,
        sigma_d = config.sigma_d,
        sigma_r,
        iterations = config.iterations,
        "Flattening luminance"
    );

    iterate_with_tables(plane, &tables, config.iterations)
}

/// Flatten one image.
///
/// # Arguments
/// * `image` - Image (height, width, channels) as u8
/// * `splitter` - Luma/chroma decomposition used when channels > 1
/// * `config` - Bandwidths and iteration count
///
/// # Returns
/// Image with the same shape. For color input the chroma planes produced by
/// `splitter.split` reach `splitter.merge` unchanged.
pub fn flatten_image<S>(
    image: ArrayView3<u8>,
    splitter: &S,
    config: &FlattenConfig,
) -> FilterResult<Array3<u8>>
where
    S: LumaChromaSplit + ?Sized,
{
    config.validate()?;
    ensure_non_empty(image.dim())?;

    let channels = image.dim().2;
    if channels == 1 {
        return flatten_plane(image, config);
    }

    splitter.check_channels(channels)?;
    let (luma, chroma) = splitter.split(image)?;
    let filtered = flatten_plane(luma.view(), config)?;
    splitter.merge(filtered.view(), chroma.view())
}

/// Flatten grayscale, RGB or RGBA input through CIE L*a*b*.
pub fn flatten_rgb(image: ArrayView3<u8>, config: &FlattenConfig) -> FilterResult<Array3<u8>> {
    flatten_image(image, &CieLab, config)
}

/// Flatten independent images in parallel.
///
/// Each image gets its own range bandwidth and tables. Results keep input
/// order; one failure does not affect the other images.
pub fn flatten_batch<S>(
    images: &[Array3<u8>],
    splitter: &S,
    config: &FlattenConfig,
) -> Vec<FilterResult<Array3<u8>>>
where
    S: LumaChromaSplit + Sync + ?Sized,
{
    images
        .par_iter()
        .enumerate()
        .map(|(index, image)| {
            let result = flatten_image(image.view(), splitter, config);
            if let Err(err) = &result {
                warn!(index, error = %err, "Failed to flatten image");
            }
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::filters::bilateral::iterative_bilateral_filter;
    use crate::filters::color_space::LeadingChannel;
    use crate::filters::core::BoundaryAlignment;

    fn noisy_gray(height: usize, width: usize) -> Array3<u8> {
        Array3::from_shape_fn((height, width, 1), |(y, x, _)| {
            let base = if x < width / 2 { 60 } else { 190 };
            base + ((x * 7 + y * 13) % 9) as u8
        })
    }

    #[test]
    fn test_gray_matches_direct_filter() {
        let img = noisy_gray(10, 12);
        let config = FlattenConfig::default().with_sigma_d(1.0).with_iterations(2);

        let sigma_r = estimate_range_bandwidth_with_floor(img.view(), 10.0).unwrap();
        let expected = iterative_bilateral_filter(img.view(), 1.0, sigma_r, 2).unwrap();
        let result = flatten_image(img.view(), &CieLab, &config).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn test_chroma_bit_identical() {
        let img = Array3::from_shape_fn((8, 9, 3), |(y, x, c)| match c {
            0 => (x * 25 + y * 3) as u8,
            1 => (y * 31 % 256) as u8,
            _ => (x * 17 % 256) as u8,
        });
        let config = FlattenConfig::default().with_sigma_d(1.0).with_iterations(3);
        let result = flatten_image(img.view(), &LeadingChannel, &config).unwrap();

        assert_eq!(result.dim(), img.dim());
        for y in 0..8 {
            for x in 0..9 {
                assert_eq!(result[[y, x, 1]], img[[y, x, 1]]);
                assert_eq!(result[[y, x, 2]], img[[y, x, 2]]);
            }
        }
    }

    #[test]
    fn test_luma_is_filtered() {
        let img = Array3::from_shape_fn((8, 8, 2), |(y, x, c)| {
            if c == 0 {
                ((x + y) % 2 * 20 + 100) as u8
            } else {
                42
            }
        });
        let config = FlattenConfig::default().with_sigma_d(1.0).with_range_sigma(50.0);
        let result = flatten_image(img.view(), &LeadingChannel, &config).unwrap();

        // Checkerboard of 100/120 is averaged toward 110
        assert!(result[[4, 4, 0]] > 100 && result[[4, 4, 0]] < 120);
    }

    #[test]
    fn test_rgb_flat_color_roundtrips() {
        let img = Array3::<u8>::from_elem((6, 6, 3), 128);
        let result = flatten_rgb(img.view(), &FlattenConfig::default()).unwrap();
        assert_eq!(result, img);
    }

    #[test]
    fn test_rgba_alpha_untouched() {
        let img = Array3::from_shape_fn((5, 5, 4), |(y, x, c)| {
            if c == 3 {
                (x * 50 + y) as u8
            } else {
                (x * 40 + c * 10) as u8
            }
        });
        let config = FlattenConfig::default().with_sigma_d(1.0);
        let result = flatten_rgb(img.view(), &config).unwrap();
        for y in 0..5 {
            for x in 0..5 {
                assert_eq!(result[[y, x, 3]], img[[y, x, 3]]);
            }
        }
    }

    #[test]
    fn test_fixed_sigma_respects_floor() {
        let img = noisy_gray(6, 6);
        let config = FlattenConfig::default().with_range_sigma(2.0);
        assert_eq!(resolve_range_sigma(img.view(), &config).unwrap(), 10.0);

        let config = FlattenConfig::default().with_range_sigma(35.0);
        assert_eq!(resolve_range_sigma(img.view(), &config).unwrap(), 35.0);
    }

    #[test]
    fn test_alignment_from_config() {
        let img = noisy_gray(5, 5);
        let centered = FlattenConfig::default().with_sigma_d(1.0);
        let legacy = centered.with_alignment(BoundaryAlignment::TruncatedTopLeft);

        let a = flatten_image(img.view(), &CieLab, &centered).unwrap();
        let b = flatten_image(img.view(), &CieLab, &legacy).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_shape_mismatch() {
        let img = Array3::<u8>::zeros((4, 4, 2));
        assert!(matches!(
            flatten_rgb(img.view(), &FlattenConfig::default()),
            Err(FilterError::ShapeMismatch { actual: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_config_and_empty_input() {
        let img = noisy_gray(4, 4);
        let config = FlattenConfig::default().with_sigma_d(-1.0);
        assert!(matches!(
            flatten_rgb(img.view(), &config),
            Err(FilterError::InvalidParameter(_))
        ));

        let empty = Array3::<u8>::zeros((0, 3, 3));
        assert!(matches!(
            flatten_rgb(empty.view(), &FlattenConfig::default()),
            Err(FilterError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let images = vec![
            noisy_gray(6, 6),
            Array3::<u8>::zeros((4, 4, 2)),
            Array3::<u8>::from_elem((5, 7, 3), 200),
        ];
        let config = FlattenConfig::default().with_sigma_d(1.0);
        let results = flatten_batch(&images, &CieLab, &config);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().dim(), (6, 6, 1));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().dim(), (5, 7, 3));
    }
}
