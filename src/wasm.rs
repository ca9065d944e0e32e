//! WebAssembly exports for EdgeFlat.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Images are
//! passed as flat u8 slices in (height, width, channels) order.

use ndarray::{Array3, ArrayView3};
use wasm_bindgen::prelude::*;

use crate::config::FlattenConfig;
use crate::error::FilterError;
use crate::filters::{bilateral_filter, flatten_rgb};

fn to_js(err: FilterError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn view<'a>(
    data: &'a [u8],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<ArrayView3<'a, u8>, JsValue> {
    ArrayView3::from_shape((height, width, channels), data)
        .map_err(|e| JsValue::from_str(&format!("Invalid dimensions: {e}")))
}

fn into_vec(result: Array3<u8>) -> Vec<u8> {
    result.into_raw_vec_and_offset().0
}

// ============================================================================
// Bilateral Filter
// ============================================================================

/// Single bilateral pass over every channel.
///
/// # Arguments
/// * `data` - Flat array of bytes (length = width * height * channels)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - Channels per pixel
/// * `sigma_d` - Spatial bandwidth
/// * `sigma_r` - Range bandwidth
#[wasm_bindgen]
pub fn bilateral_filter_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    sigma_d: f32,
    sigma_r: f32,
) -> Result<Vec<u8>, JsValue> {
    let input = view(data, width, height, channels)?;
    bilateral_filter(input, sigma_d, sigma_r)
        .map(into_vec)
        .map_err(to_js)
}

// ============================================================================
// Flattening
// ============================================================================

/// Flatten grayscale, RGB or RGBA bytes; the range bandwidth is estimated.
#[wasm_bindgen]
pub fn flatten_image_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    sigma_d: f32,
    iterations: usize,
) -> Result<Vec<u8>, JsValue> {
    let input = view(data, width, height, channels)?;
    let config = FlattenConfig::default()
        .with_sigma_d(sigma_d)
        .with_iterations(iterations);
    flatten_rgb(input, &config).map(into_vec).map_err(to_js)
}
