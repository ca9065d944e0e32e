//! Error types for edge-preserving flattening.
//!
//! Every error is detected at the entry of the operation that raises it.
//! No operation returns a partially filtered buffer.

use thiserror::Error;

/// Errors that can occur while building tables or filtering
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// A bandwidth, level count or iteration count is out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The buffer has zero height, width or channels
    #[error("empty input: buffer has shape {height}x{width}x{channels}")]
    EmptyInput {
        height: usize,
        width: usize,
        channels: usize,
    },

    /// Channel count does not fit the declared color mode
    #[error("shape mismatch: expected {expected}, got {actual} channels")]
    ShapeMismatch {
        /// Description of the accepted channel layout
        expected: &'static str,
        /// Channel count actually seen
        actual: usize,
    },
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

impl FilterError {
    pub(crate) fn non_positive(name: &str, value: f32) -> Self {
        FilterError::InvalidParameter(format!("{name} must be positive and finite, got {value}"))
    }
}

/// Rejects non-finite and non-positive values.
pub(crate) fn ensure_positive(name: &str, value: f32) -> FilterResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FilterError::non_positive(name, value))
    }
}

/// Rejects buffers with any zero-length axis.
pub(crate) fn ensure_non_empty(dim: (usize, usize, usize)) -> FilterResult<()> {
    let (height, width, channels) = dim;
    if height == 0 || width == 0 || channels == 0 {
        return Err(FilterError::EmptyInput {
            height,
            width,
            channels,
        });
    }
    Ok(())
}

#[cfg(feature = "python")]
impl From<FilterError> for pyo3::PyErr {
    fn from(err: FilterError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("sigma_d", 1.5).is_ok());
        assert!(ensure_positive("sigma_d", 0.0).is_err());
        assert!(ensure_positive("sigma_d", -2.0).is_err());
        assert!(ensure_positive("sigma_d", f32::NAN).is_err());
        assert!(ensure_positive("sigma_d", f32::INFINITY).is_err());
    }

    #[test]
    fn test_ensure_non_empty() {
        assert!(ensure_non_empty((2, 2, 1)).is_ok());
        assert_eq!(
            ensure_non_empty((0, 4, 3)),
            Err(FilterError::EmptyInput {
                height: 0,
                width: 4,
                channels: 3
            })
        );
    }

    #[test]
    fn test_error_messages() {
        let err = FilterError::ShapeMismatch {
            expected: "3 or 4 channels",
            actual: 2,
        };
        assert_eq!(err.to_string(), "shape mismatch: expected 3 or 4 channels, got 2 channels");
        assert!(FilterError::non_positive("sigma_r", 0.0)
            .to_string()
            .contains("sigma_r"));
    }
}
