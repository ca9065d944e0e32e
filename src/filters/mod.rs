//! Filter modules for edge-preserving flattening.
//!
//! ## Supported Formats
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Grayscale8 | (H, W, 1) | u8 | Filtered directly |
//! | RGB8 | (H, W, 3) | u8 | Luminance filtered, chroma untouched |
//! | RGBA8 | (H, W, 4) | u8 | As RGB, alpha preserved |
//! | Luma-first | (H, W, 2+) | u8 | Channel 0 filtered via `LeadingChannel` |
//!
//! ## Architecture
//!
//! - **core** - domain kernel and range LUT, built once per invocation
//! - **bilateral** - per-pixel kernel, single pass and iterative driver
//! - **statistics** - std dev, histograms, range bandwidth estimate
//! - **color_space** - luma/chroma split and merge collaborators
//! - **flatten** - channel-selective orchestration and batch processing
//!
//! Passes are parallel over rows (rayon); iterations are sequential.

pub mod bilateral;
pub mod color_space;
pub mod core;
pub mod flatten;
pub mod statistics;

pub use bilateral::{
    bilateral_filter, bilateral_filter_with_tables, bilateral_response,
    iterate_with_tables, iterative_bilateral_filter,
};
pub use color_space::{CieLab, LeadingChannel, LumaChromaSplit};
pub use self::core::{
    build_domain_kernel, build_range_lut, BilateralTables, BoundaryAlignment,
    INTENSITY_LEVELS, MAX_INTENSITY, MAX_KERNEL_RADIUS,
};
pub use flatten::{flatten_batch, flatten_image, flatten_rgb};
pub use statistics::{
    channel_histogram, estimate_range_bandwidth, estimate_range_bandwidth_with_floor,
    histograms, intensity_std_dev,
};
