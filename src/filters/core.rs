//! Weight tables shared by every bilateral pass.
//!
//! This module provides the two precomputed tables a pass reads:
//! - Range LUT: similarity weight per absolute intensity difference
//! - Domain kernel: normalized 2D spatial Gaussian
//!
//! Both are built once per filter invocation and only read afterwards,
//! so a single `BilateralTables` can be shared by every worker thread.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ensure_positive, FilterError, FilterResult};

/// Number of distinct 8-bit intensities (0-255)
pub const INTENSITY_LEVELS: usize = 256;

/// Largest 8-bit intensity
pub const MAX_INTENSITY: f32 = 255.0;

/// Largest accepted domain kernel radius (side 2049)
pub const MAX_KERNEL_RADIUS: usize = 1024;

/// Unnormalized Gaussian of a distance already scaled by its sigma.
///
/// Scaling first keeps tiny sigmas from turning the center into 0/0.
#[inline]
fn gaussian(t: f32) -> f32 {
    (-0.5 * t * t).exp()
}

/// How the domain kernel lines up with a window clipped by the image border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryAlignment {
    /// Kernel center always sits on the output pixel; clipped cells are dropped.
    #[default]
    Centered,
    /// A clipped window of size (rows, cols) uses kernel cells [0..rows, 0..cols].
    TruncatedTopLeft,
}

// ============================================================================
// Range LUT
// ============================================================================

/// Precompute range (similarity) weights.
///
/// Entry `i` is `exp(-i^2 / (2 * sigma_r^2))`. The table is not normalized;
/// normalization happens per pixel once spatial weights are applied.
///
/// # Arguments
/// * `levels` - Table length, one entry per possible difference (256 for u8)
/// * `sigma_r` - Range bandwidth
pub fn build_range_lut(levels: usize, sigma_r: f32) -> FilterResult<Array1<f32>> {
    if levels == 0 {
        return Err(FilterError::InvalidParameter(
            "range table needs at least one level".to_string(),
        ));
    }
    ensure_positive("sigma_r", sigma_r)?;

    Ok(Array1::from_shape_fn(levels, |i| gaussian(i as f32 / sigma_r)))
}

// ============================================================================
// Domain Kernel
// ============================================================================

/// Radius covering three standard deviations on each side.
///
/// Fails for radii above `MAX_KERNEL_RADIUS`.
pub fn kernel_radius(sigma_d: f32) -> FilterResult<usize> {
    ensure_positive("sigma_d", sigma_d)?;
    let reach = (3.0 * sigma_d).ceil();
    if reach > MAX_KERNEL_RADIUS as f32 {
        return Err(FilterError::InvalidParameter(format!(
            "sigma_d {sigma_d} needs a kernel radius above {MAX_KERNEL_RADIUS}"
        )));
    }
    Ok(reach as usize)
}

/// Generate the normalized 2D spatial Gaussian.
///
/// Side length is `2 * ceil(3 * sigma_d) + 1`; cell (dy, dx) relative to the
/// center weighs `exp(-(dx^2 + dy^2) / (2 * sigma_d^2))` before normalization.
///
/// # Returns
/// Square kernel whose weights sum to 1.0
pub fn build_domain_kernel(sigma_d: f32) -> FilterResult<Array2<f32>> {
    let radius = kernel_radius(sigma_d)?;
    let size = 2 * radius + 1;

    let mut kernel = Array2::<f32>::from_shape_fn((size, size), |(ky, kx)| {
        let dy = (ky as f32 - radius as f32) / sigma_d;
        let dx = (kx as f32 - radius as f32) / sigma_d;
        gaussian(dx) * gaussian(dy)
    });

    // Normalize
    let sum = kernel.sum();
    kernel.mapv_inplace(|v| v / sum);

    Ok(kernel)
}

// ============================================================================
// Shared tables
// ============================================================================

/// Immutable domain kernel + range LUT pair for one filter invocation.
#[derive(Debug, Clone)]
pub struct BilateralTables {
    domain: Array2<f32>,
    range: Array1<f32>,
    radius: usize,
    alignment: BoundaryAlignment,
}

impl BilateralTables {
    /// Build both tables for 8-bit data.
    pub fn new(sigma_d: f32, sigma_r: f32) -> FilterResult<Self> {
        Self::with_levels(sigma_d, sigma_r, INTENSITY_LEVELS)
    }

    /// Build both tables with an explicit range table length.
    pub fn with_levels(sigma_d: f32, sigma_r: f32, levels: usize) -> FilterResult<Self> {
        let domain = build_domain_kernel(sigma_d)?;
        let range = build_range_lut(levels, sigma_r)?;
        debug!(
            sigma_d,
            sigma_r,
            kernel_size = domain.nrows(),
            levels,
            "Built bilateral tables"
        );
        Self::from_parts(domain, range)
    }

    /// Wrap tables built elsewhere.
    ///
    /// The domain kernel must be square with an odd side; the range table
    /// must be non-empty.
    pub fn from_parts(domain: Array2<f32>, range: Array1<f32>) -> FilterResult<Self> {
        let (rows, cols) = domain.dim();
        if rows != cols || rows % 2 == 0 {
            return Err(FilterError::InvalidParameter(format!(
                "domain kernel must be square with odd side, got {rows}x{cols}"
            )));
        }
        if range.is_empty() {
            return Err(FilterError::InvalidParameter(
                "range table must not be empty".to_string(),
            ));
        }
        Ok(Self {
            domain,
            range,
            radius: rows / 2,
            alignment: BoundaryAlignment::default(),
        })
    }

    pub fn with_alignment(mut self, alignment: BoundaryAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn domain(&self) -> &Array2<f32> {
        &self.domain
    }

    pub fn range(&self) -> &Array1<f32> {
        &self.range
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn alignment(&self) -> BoundaryAlignment {
        self.alignment
    }

    /// Weight for an absolute intensity difference; zero past the table end.
    #[inline]
    pub fn range_weight(&self, diff: usize) -> f32 {
        self.range.get(diff).copied().unwrap_or(0.0)
    }
}
