//! Bilateral filter (edge-preserving smoothing).
//!
//! Each output sample is a weighted mean of its neighborhood where the
//! weight of a neighbor is the product of:
//! - its spatial weight from the domain kernel
//! - its similarity weight from the range LUT (indexed by |neighbor - center|)
//!
//! Weights are renormalized over the window actually inside the image, so
//! border pixels see a smaller, asymmetric window instead of padding.
//!
//! ## Supported Formats
//!
//! Any channel count; every channel is filtered independently.
//!
//! ## Parallelism
//!
//! Output rows are distributed over the rayon pool. All workers read the
//! same input view and the same `BilateralTables`; each writes only its own
//! row. Iterations run strictly one after another.

use ndarray::{Array3, ArrayView3, Axis};
use rayon::prelude::*;
use tracing::debug;

use super::core::{BilateralTables, BoundaryAlignment, MAX_INTENSITY};
use crate::error::{ensure_non_empty, FilterError, FilterResult};

// ============================================================================
// Per-pixel kernel
// ============================================================================

/// Weighted mean of the clipped window around (y, x) on channel `c`.
#[inline]
fn filter_sample(
    input: &ArrayView3<u8>,
    tables: &BilateralTables,
    y: usize,
    x: usize,
    c: usize,
) -> f32 {
    let (height, width, _) = input.dim();
    let r = tables.radius();
    let domain = tables.domain();

    let y0 = y.saturating_sub(r);
    let y1 = (y + r + 1).min(height);
    let x0 = x.saturating_sub(r);
    let x1 = (x + r + 1).min(width);

    // Kernel cell that lines up with (y0, x0)
    let (ky0, kx0) = match tables.alignment() {
        BoundaryAlignment::Centered => (y0 + r - y, x0 + r - x),
        BoundaryAlignment::TruncatedTopLeft => (0, 0),
    };

    let center = input[[y, x, c]] as i32;
    let mut sum = 0.0f32;
    let mut weight_sum = 0.0f32;

    for (ky, sy) in (ky0..).zip(y0..y1) {
        for (kx, sx) in (kx0..).zip(x0..x1) {
            let value = input[[sy, sx, c]] as i32;
            let weight =
                domain[[ky, kx]] * tables.range_weight((value - center).unsigned_abs() as usize);
            sum += value as f32 * weight;
            weight_sum += weight;
        }
    }

    if weight_sum > 0.0 {
        sum / weight_sum
    } else {
        center as f32
    }
}

#[inline]
fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, MAX_INTENSITY) as u8
}

fn run_pass<T, F>(input: ArrayView3<u8>, tables: &BilateralTables, write: F) -> Array3<T>
where
    T: Copy + Default + Send + Sync,
    F: Fn(f32) -> T + Sync,
{
    let (height, width, channels) = input.dim();
    let mut output = Array3::<T>::default((height, width, channels));

    output
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for x in 0..width {
                for c in 0..channels {
                    row[[x, c]] = write(filter_sample(&input, tables, y, x, c));
                }
            }
        });

    output
}

// ============================================================================
// Single pass
// ============================================================================

/// Apply one bilateral pass with precomputed tables.
///
/// # Arguments
/// * `input` - Image (height, width, channels) as u8
/// * `tables` - Domain kernel and range LUT shared by every pixel
///
/// # Returns
/// Filtered image with the same shape, values rounded to 0-255
pub fn bilateral_filter_with_tables(
    input: ArrayView3<u8>,
    tables: &BilateralTables,
) -> FilterResult<Array3<u8>> {
    ensure_non_empty(input.dim())?;
    Ok(run_pass(input, tables, quantize))
}

/// Apply one bilateral pass, building the tables for this call.
///
/// # Arguments
/// * `input` - Image (height, width, channels) as u8
/// * `sigma_d` - Spatial bandwidth (> 0)
/// * `sigma_r` - Range bandwidth (> 0)
pub fn bilateral_filter(
    input: ArrayView3<u8>,
    sigma_d: f32,
    sigma_r: f32,
) -> FilterResult<Array3<u8>> {
    let tables = BilateralTables::new(sigma_d, sigma_r)?;
    bilateral_filter_with_tables(input, &tables)
}

/// Unquantized weighted means for one pass.
///
/// Same computation as `bilateral_filter_with_tables` without the final
/// rounding, for callers that chain float operations.
pub fn bilateral_response(
    input: ArrayView3<u8>,
    tables: &BilateralTables,
) -> FilterResult<Array3<f32>> {
    ensure_non_empty(input.dim())?;
    Ok(run_pass(input, tables, |v| v))
}

// ============================================================================
// Iterative driver
// ============================================================================

/// Re-apply the bilateral pass `iterations` times with the same tables.
///
/// Each pass consumes the fully materialized output of the previous one.
/// There is no convergence check.
pub fn iterate_with_tables(
    input: ArrayView3<u8>,
    tables: &BilateralTables,
    iterations: usize,
) -> FilterResult<Array3<u8>> {
    if iterations == 0 {
        return Err(FilterError::InvalidParameter(
            "iterations must be at least 1".to_string(),
        ));
    }

    let mut current = bilateral_filter_with_tables(input, tables)?;
    for pass in 1..iterations {
        debug!(pass = pass + 1, iterations, "Bilateral pass");
        current = bilateral_filter_with_tables(current.view(), tables)?;
    }
    Ok(current)
}

/// Iterated bilateral filter for a flattened, cartoon-like result.
///
/// Tables are built once since the bandwidths stay fixed across passes.
pub fn iterative_bilateral_filter(
    input: ArrayView3<u8>,
    sigma_d: f32,
    sigma_r: f32,
    iterations: usize,
) -> FilterResult<Array3<u8>> {
    let tables = BilateralTables::new(sigma_d, sigma_r)?;
    iterate_with_tables(input, &tables, iterations)
}
