//! Flattening configuration.
//!
//! A `FlattenConfig` is an immutable value threaded through every call.
//! It can be built in code, deserialized, or read from the environment.

use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ensure_positive, FilterError, FilterResult};
use crate::filters::core::BoundaryAlignment;

/// Default spatial bandwidth in pixels
pub const DEFAULT_SIGMA_D: f32 = 5.0;

/// Floor applied to estimated range bandwidths; also the lowest floor accepted
pub const DEFAULT_MIN_RANGE_SIGMA: f32 = 10.0;

/// Reject range floors that would let the bandwidth drop below 10.
pub(crate) fn ensure_range_floor(min_range_sigma: f32) -> FilterResult<()> {
    ensure_positive("min_range_sigma", min_range_sigma)?;
    if min_range_sigma < DEFAULT_MIN_RANGE_SIGMA {
        return Err(FilterError::InvalidParameter(format!(
            "min_range_sigma must be at least {DEFAULT_MIN_RANGE_SIGMA}, got {min_range_sigma}"
        )));
    }
    Ok(())
}

fn parse_alignment(value: &str) -> Option<BoundaryAlignment> {
    match value {
        "centered" => Some(BoundaryAlignment::Centered),
        "truncated_top_left" => Some(BoundaryAlignment::TruncatedTopLeft),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    /// Spatial (domain) bandwidth
    pub sigma_d: f32,
    /// Number of bilateral passes over the luminance channel
    pub iterations: usize,
    /// Fixed range bandwidth; `None` estimates one per image
    pub range_sigma: Option<f32>,
    /// Lower bound for range bandwidths (at least 10)
    pub min_range_sigma: f32,
    /// Kernel alignment for windows truncated at the image border
    pub alignment: BoundaryAlignment,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            sigma_d: DEFAULT_SIGMA_D,
            iterations: 1,
            range_sigma: None,
            min_range_sigma: DEFAULT_MIN_RANGE_SIGMA,
            alignment: BoundaryAlignment::Centered,
        }
    }
}

impl FlattenConfig {
    /// Read `EDGEFLAT_*` variables, falling back to defaults for anything
    /// missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sigma_d: env::var("EDGEFLAT_SIGMA_D")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sigma_d),
            iterations: env::var("EDGEFLAT_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.iterations),
            range_sigma: env::var("EDGEFLAT_RANGE_SIGMA")
                .ok()
                .and_then(|v| v.parse().ok()),
            min_range_sigma: env::var("EDGEFLAT_MIN_RANGE_SIGMA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_range_sigma),
            alignment: env::var("EDGEFLAT_ALIGNMENT")
                .ok()
                .map(|v| {
                    parse_alignment(&v).unwrap_or_else(|| {
                        warn!(value = %v, "Unrecognized EDGEFLAT_ALIGNMENT, using centered");
                        defaults.alignment
                    })
                })
                .unwrap_or(defaults.alignment),
        }
    }

    pub fn with_sigma_d(mut self, sigma_d: f32) -> Self {
        self.sigma_d = sigma_d;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_range_sigma(mut self, range_sigma: f32) -> Self {
        self.range_sigma = Some(range_sigma);
        self
    }

    pub fn with_alignment(mut self, alignment: BoundaryAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Check every field before any pixel is touched.
    pub fn validate(&self) -> FilterResult<()> {
        ensure_positive("sigma_d", self.sigma_d)?;
        ensure_range_floor(self.min_range_sigma)?;
        if let Some(sigma_r) = self.range_sigma {
            ensure_positive("range_sigma", sigma_r)?;
        }
        if self.iterations == 0 {
            return Err(FilterError::InvalidParameter(
                "iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = FlattenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sigma_d, 5.0);
        assert_eq!(config.iterations, 1);
        assert_eq!(config.range_sigma, None);
        assert_eq!(config.min_range_sigma, 10.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(FlattenConfig::default().with_sigma_d(0.0).validate().is_err());
        assert!(FlattenConfig::default().with_iterations(0).validate().is_err());
        assert!(FlattenConfig::default()
            .with_range_sigma(-1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_low_range_floor() {
        let config = FlattenConfig {
            min_range_sigma: 5.0,
            ..FlattenConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FilterError::InvalidParameter(_))
        ));

        let config = FlattenConfig {
            min_range_sigma: 25.0,
            ..FlattenConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_alignment() {
        assert_eq!(parse_alignment("centered"), Some(BoundaryAlignment::Centered));
        assert_eq!(
            parse_alignment("truncated_top_left"),
            Some(BoundaryAlignment::TruncatedTopLeft)
        );
        assert_eq!(parse_alignment("top-left"), None);
        assert_eq!(parse_alignment(""), None);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: FlattenConfig =
            serde_json::from_str(r#"{"sigma_d": 2.5, "iterations": 4}"#).unwrap();
        assert_eq!(config.sigma_d, 2.5);
        assert_eq!(config.iterations, 4);
        assert_eq!(config.min_range_sigma, DEFAULT_MIN_RANGE_SIGMA);
        assert_eq!(config.alignment, BoundaryAlignment::Centered);
    }

    #[test]
    fn test_deserialize_alignment() {
        let config: FlattenConfig =
            serde_json::from_str(r#"{"alignment": "truncated_top_left", "range_sigma": 30.0}"#)
                .unwrap();
        assert_eq!(config.alignment, BoundaryAlignment::TruncatedTopLeft);
        assert_eq!(config.range_sigma, Some(30.0));
    }
}
