//! EdgeFlat
//!
//! Edge-preserving flattening with a bilateral filter, with Python
//! bindings via PyO3 and WASM bindings for JavaScript.
//!
//! ## Image Format
//! Images are `(height, width, channels)` u8 arrays (0-255):
//! - **Grayscale**: (height, width, 1) - filtered directly
//! - **RGB**: (height, width, 3) - only the L* channel is filtered
//! - **RGBA**: (height, width, 4) - as RGB, alpha preserved
//!
//! ## Pipeline
//! 1. Split color input into luminance and chroma (`LumaChromaSplit`)
//! 2. Estimate the range bandwidth from the luminance std dev (floor 10)
//! 3. Build the domain kernel and range LUT once
//! 4. Run the bilateral pass, optionally several times
//! 5. Merge the filtered luminance with the untouched chroma

pub mod config;
pub mod error;
pub mod filters;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::FlattenConfig;
pub use error::{FilterError, FilterResult};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray1, PyArray2, PyArray3, PyReadonlyArray3};
    use pyo3::prelude::*;

    use crate::config::FlattenConfig;
    use crate::filters::{self, BilateralTables};

    // ========================================================================
    // Tables
    // ========================================================================

    /// Range weights for every absolute intensity difference.
    #[pyfunction]
    #[pyo3(signature = (sigma_r, levels=256))]
    pub fn build_range_lut<'py>(
        py: Python<'py>,
        sigma_r: f32,
        levels: usize,
    ) -> PyResult<Bound<'py, PyArray1<f32>>> {
        Ok(filters::build_range_lut(levels, sigma_r)?.into_pyarray(py))
    }

    /// Normalized spatial Gaussian of side 2 * ceil(3 * sigma_d) + 1.
    #[pyfunction]
    pub fn build_domain_kernel<'py>(
        py: Python<'py>,
        sigma_d: f32,
    ) -> PyResult<Bound<'py, PyArray2<f32>>> {
        Ok(filters::build_domain_kernel(sigma_d)?.into_pyarray(py))
    }

    // ========================================================================
    // Bilateral Filter
    // ========================================================================

    /// Single bilateral pass over every channel.
    ///
    /// # Arguments
    /// * `image` - Input image (height, width, channels) as u8
    /// * `sigma_d` - Spatial bandwidth
    /// * `sigma_r` - Range bandwidth
    #[pyfunction]
    pub fn bilateral_filter<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        sigma_d: f32,
        sigma_r: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let input = image.as_array();
        let result = filters::bilateral_filter(input, sigma_d, sigma_r)?;
        Ok(result.into_pyarray(py))
    }

    /// Repeated bilateral passes for a flattened look.
    #[pyfunction]
    #[pyo3(signature = (image, sigma_d, sigma_r, iterations=5))]
    pub fn iterative_bilateral_filter<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        sigma_d: f32,
        sigma_r: f32,
        iterations: usize,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let input = image.as_array();
        let tables = BilateralTables::new(sigma_d, sigma_r)?;
        let result = filters::iterate_with_tables(input, &tables, iterations)?;
        Ok(result.into_pyarray(py))
    }

    /// Range bandwidth from a single-channel image: max(round(std), 10).
    #[pyfunction]
    pub fn estimate_range_bandwidth(image: PyReadonlyArray3<'_, u8>) -> PyResult<f32> {
        Ok(filters::estimate_range_bandwidth(image.as_array())?)
    }

    // ========================================================================
    // Flattening
    // ========================================================================

    /// Flatten grayscale directly, or RGB/RGBA through L*a*b* luminance only.
    ///
    /// # Arguments
    /// * `image` - Input image (height, width, 1|3|4) as u8
    /// * `sigma_d` - Spatial bandwidth (default: 5.0)
    /// * `iterations` - Number of passes (default: 1)
    /// * `sigma_r` - Fixed range bandwidth; estimated per image when omitted
    #[pyfunction]
    #[pyo3(signature = (image, sigma_d=5.0, iterations=1, sigma_r=None))]
    pub fn flatten_image<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        sigma_d: f32,
        iterations: usize,
        sigma_r: Option<f32>,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let input = image.as_array();
        let mut config = FlattenConfig::default()
            .with_sigma_d(sigma_d)
            .with_iterations(iterations);
        config.range_sigma = sigma_r;
        let result = filters::flatten_rgb(input, &config)?;
        Ok(result.into_pyarray(py))
    }

    /// EdgeFlat extension module
    #[pymodule]
    pub fn edgeflat(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Tables
        m.add_function(wrap_pyfunction!(build_range_lut, m)?)?;
        m.add_function(wrap_pyfunction!(build_domain_kernel, m)?)?;

        // Filtering
        m.add_function(wrap_pyfunction!(bilateral_filter, m)?)?;
        m.add_function(wrap_pyfunction!(iterative_bilateral_filter, m)?)?;
        m.add_function(wrap_pyfunction!(estimate_range_bandwidth, m)?)?;
        m.add_function(wrap_pyfunction!(flatten_image, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::edgeflat;
