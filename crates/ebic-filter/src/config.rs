//! Correction settings

use crate::bias::BiasComponents;
use crate::bspline::{DEFAULT_MESH_SIZE, DEFAULT_SPLINE_ORDER, MAX_SPLINE_ORDER};
use crate::error::{FilterError, FilterResult};
use ebic_core::{DEFAULT_BINS, DEFAULT_MARGINAL_SCALE, HistogramOptions};
use ebic_optim::PowellConfig;
use serde::{Deserialize, Serialize};

/// Default lower limit on the corrected intensity span, as a fraction of
/// the input span
pub const DEFAULT_MIN_SPAN_FRACTION: f64 = 0.5;

/// Options for entropy-based bias correction
///
/// Deserializes from a partial JSON document; missing fields keep their
/// defaults.
///
/// ```
/// use ebic_filter::CorrectionConfig;
///
/// let config: CorrectionConfig = serde_json::from_str(r#"{ "bins": 64 }"#).unwrap();
/// assert_eq!(config.bins, 64);
/// assert_eq!(config.mesh_size, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Histogram bins used by the entropy metric
    pub bins: usize,
    /// Divisor of the margin added above an auto-detected maximum
    pub marginal_scale: f64,
    /// Fixed histogram range; auto-detected per evaluation when `None`
    pub histogram_range: Option<(f64, f64)>,
    /// Subsampling step of the samples feeding the histogram
    pub sample_step: usize,
    /// Mask label selecting samples; `None` = any non-zero label
    pub mask_label: Option<u8>,
    /// Which bias components are estimated
    pub components: BiasComponents,
    /// Mesh cells per lattice axis
    pub mesh_size: usize,
    /// B-spline order of the lattices
    pub spline_order: usize,
    /// Scale the additive component by the input intensity span
    pub normalize_intensities: bool,
    /// Parameter sets shrinking the intensity span below this fraction of
    /// the input span are penalized
    pub min_span_fraction: f64,
    /// Optimizer settings
    pub optimizer: PowellConfig,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            marginal_scale: DEFAULT_MARGINAL_SCALE,
            histogram_range: None,
            sample_step: 1,
            mask_label: None,
            components: BiasComponents::default(),
            mesh_size: DEFAULT_MESH_SIZE,
            spline_order: DEFAULT_SPLINE_ORDER,
            normalize_intensities: true,
            min_span_fraction: DEFAULT_MIN_SPAN_FRACTION,
            optimizer: PowellConfig::default(),
        }
    }
}

impl CorrectionConfig {
    /// Histogram options derived from these settings
    pub fn histogram_options(&self) -> HistogramOptions {
        HistogramOptions {
            bins: self.bins,
            range: self.histogram_range,
            marginal_scale: self.marginal_scale,
            sample_step: self.sample_step,
            mask_label: self.mask_label,
        }
    }

    /// Check all settings
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> FilterResult<()> {
        self.histogram_options().validate()?;
        self.optimizer.validate()?;
        if self.mesh_size == 0 {
            return Err(FilterError::InvalidParameters(
                "mesh_size must be >= 1".to_string(),
            ));
        }
        if self.spline_order > MAX_SPLINE_ORDER {
            return Err(FilterError::InvalidParameters(format!(
                "spline_order must be <= {MAX_SPLINE_ORDER}, got {}",
                self.spline_order
            )));
        }
        if !(0.0..=1.0).contains(&self.min_span_fraction) {
            return Err(FilterError::InvalidParameters(format!(
                "min_span_fraction must be in [0, 1], got {}",
                self.min_span_fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = CorrectionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.bins, 32);
        assert_eq!(config.components, BiasComponents::Both);
        assert_eq!(config.optimizer.max_iterations, 10);
    }

    #[test]
    fn test_invalid_settings() {
        let bad = [
            CorrectionConfig {
                bins: 0,
                ..Default::default()
            },
            CorrectionConfig {
                mesh_size: 0,
                ..Default::default()
            },
            CorrectionConfig {
                spline_order: 4,
                ..Default::default()
            },
            CorrectionConfig {
                min_span_fraction: 1.5,
                ..Default::default()
            },
        ];
        for config in &bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_json_round_trip_keeps_components() {
        let config = CorrectionConfig {
            components: BiasComponents::Additive,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"additive\""));
        let back: CorrectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
