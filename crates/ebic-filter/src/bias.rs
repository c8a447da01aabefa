//! Additive and multiplicative bias fields
//!
//! Each component is a B-spline over the spatial axes plus one intensity
//! axis. The intensity axis maps the input range `[min, max]` to `[0, 1]`,
//! so the field can depend on the uncorrected value as well as on the
//! position. A sample `v` at position `x` is corrected to
//!
//! ```text
//! v' = v * (1 + m(x, v)) + s * a(x, v)
//! ```
//!
//! where `s` is the input intensity span when intensities are normalized
//! and 1 otherwise. All-zero coefficients leave every sample unchanged.

use crate::bspline::{AxisWeights, ControlLattice};
use crate::config::CorrectionConfig;
use crate::error::{FilterError, FilterResult};
use ebic_core::{Error, Image};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which bias components are estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasComponents {
    /// Additive offset only
    Additive,
    /// Multiplicative gain only
    Multiplicative,
    /// Both, additive parameters first
    #[default]
    Both,
}

impl BiasComponents {
    /// Whether an additive lattice is present
    pub fn has_additive(self) -> bool {
        matches!(self, Self::Additive | Self::Both)
    }

    /// Whether a multiplicative lattice is present
    pub fn has_multiplicative(self) -> bool {
        matches!(self, Self::Multiplicative | Self::Both)
    }

    /// Number of lattices
    pub fn count(self) -> usize {
        usize::from(self.has_additive()) + usize::from(self.has_multiplicative())
    }

    /// Lower-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Additive => "additive",
            Self::Multiplicative => "multiplicative",
            Self::Both => "both",
        }
    }
}

impl FromStr for BiasComponents {
    type Err = FilterError;

    fn from_str(s: &str) -> FilterResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "additive" | "add" => Ok(Self::Additive),
            "multiplicative" | "mul" => Ok(Self::Multiplicative),
            "both" => Ok(Self::Both),
            other => Err(FilterError::InvalidParameters(format!(
                "unknown bias components '{other}' (expected additive, multiplicative or both)"
            ))),
        }
    }
}

impl std::fmt::Display for BiasComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spatially and intensity-varying bias field
#[derive(Debug, Clone, PartialEq)]
pub struct BiasField {
    spatial_dims: Vec<usize>,
    additive: Option<ControlLattice>,
    multiplicative: Option<ControlLattice>,
    intensity_min: f64,
    intensity_span: f64,
    additive_scale: f64,
}

impl BiasField {
    /// Create a zero (identity) field for images of extent `spatial_dims`
    /// whose intensities span `intensity_range`
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidParameters` for an empty extent, an
    /// unordered range or invalid lattice settings.
    pub fn new(
        spatial_dims: &[usize],
        intensity_range: (f64, f64),
        config: &CorrectionConfig,
    ) -> FilterResult<Self> {
        if spatial_dims.is_empty() || spatial_dims.contains(&0) {
            return Err(Error::InvalidDimension(spatial_dims.to_vec()).into());
        }
        let (min, max) = intensity_range;
        if !(min.is_finite() && max.is_finite() && max >= min) {
            return Err(FilterError::InvalidParameters(format!(
                "invalid intensity range [{min}, {max}]"
            )));
        }
        let axes = spatial_dims.len() + 1;
        let lattice = |present: bool| -> FilterResult<Option<ControlLattice>> {
            present
                .then(|| ControlLattice::new(axes, config.mesh_size, config.spline_order))
                .transpose()
        };
        let span = max - min;
        let additive_scale = if config.normalize_intensities && span > 0.0 {
            span
        } else {
            1.0
        };

        Ok(BiasField {
            spatial_dims: spatial_dims.to_vec(),
            additive: lattice(config.components.has_additive())?,
            multiplicative: lattice(config.components.has_multiplicative())?,
            intensity_min: min,
            intensity_span: span,
            additive_scale,
        })
    }

    /// Spatial extent the field was built for
    pub fn spatial_dims(&self) -> &[usize] {
        &self.spatial_dims
    }

    /// Estimated components
    pub fn components(&self) -> BiasComponents {
        match (self.additive.is_some(), self.multiplicative.is_some()) {
            (true, false) => BiasComponents::Additive,
            (false, true) => BiasComponents::Multiplicative,
            _ => BiasComponents::Both,
        }
    }

    /// Scale applied to the additive component
    pub fn additive_scale(&self) -> f64 {
        self.additive_scale
    }

    /// Additive lattice, if present
    pub fn additive(&self) -> Option<&ControlLattice> {
        self.additive.as_ref()
    }

    /// Multiplicative lattice, if present
    pub fn multiplicative(&self) -> Option<&ControlLattice> {
        self.multiplicative.as_ref()
    }

    fn lattices(&self) -> impl Iterator<Item = &ControlLattice> {
        self.additive.iter().chain(self.multiplicative.iter())
    }

    /// Coefficients per lattice
    pub fn parameters_per_component(&self) -> usize {
        self.lattices().next().map_or(0, ControlLattice::len)
    }

    /// Total number of parameters
    pub fn number_of_parameters(&self) -> usize {
        self.lattices().map(ControlLattice::len).sum()
    }

    /// Current parameters, additive block first
    pub fn parameters(&self) -> Vec<f64> {
        self.lattices()
            .flat_map(|l| l.coefficients().iter().copied())
            .collect()
    }

    /// Replace all coefficients
    ///
    /// # Errors
    ///
    /// Returns `FilterError::ParameterCountMismatch` if `parameters` does
    /// not hold exactly [`number_of_parameters`](Self::number_of_parameters)
    /// values.
    pub fn set_parameters(&mut self, parameters: &[f64]) -> FilterResult<()> {
        let expected = self.number_of_parameters();
        if parameters.len() != expected {
            return Err(FilterError::ParameterCountMismatch {
                expected,
                actual: parameters.len(),
            });
        }
        let mut rest = parameters;
        for lattice in self.additive.iter_mut().chain(self.multiplicative.iter_mut()) {
            let (head, tail) = rest.split_at(lattice.len());
            lattice.coefficients_mut().copy_from_slice(head);
            rest = tail;
        }
        Ok(())
    }

    /// Basis weights for every coordinate along every spatial axis
    pub fn spatial_weights(&self) -> Vec<Vec<AxisWeights>> {
        let Some(lattice) = self.lattices().next() else {
            return Vec::new();
        };
        self.spatial_dims
            .iter()
            .map(|&n| {
                (0..n)
                    .map(|c| {
                        let t = if n > 1 { c as f64 / (n - 1) as f64 } else { 0.0 };
                        lattice.weights_at(t)
                    })
                    .collect()
            })
            .collect()
    }

    /// Basis weights along the intensity axis for an uncorrected value
    pub fn intensity_weights(&self, value: f64) -> AxisWeights {
        let t = if self.intensity_span > 0.0 {
            (value - self.intensity_min) / self.intensity_span
        } else {
            0.0
        };
        match self.lattices().next() {
            Some(lattice) => lattice.weights_at(t),
            None => crate::bspline::basis_weights(0, 1, t),
        }
    }

    /// Offset and gain at a point given its per-axis weights (spatial axes
    /// then intensity)
    ///
    /// The offset already includes the additive scale.
    pub fn field_at(&self, weights: &[AxisWeights]) -> (f64, f64) {
        let offset = self
            .additive
            .as_ref()
            .map_or(0.0, |l| self.additive_scale * l.evaluate(weights));
        let gain = self
            .multiplicative
            .as_ref()
            .map_or(1.0, |l| 1.0 + l.evaluate(weights));
        (offset, gain)
    }

    /// Corrected value of `value` at a point with the given weights
    #[inline]
    pub fn apply(&self, value: f64, weights: &[AxisWeights]) -> f64 {
        let (offset, gain) = self.field_at(weights);
        value * gain + offset
    }

    /// Write the corrected version of `image` into `output`
    ///
    /// # Errors
    ///
    /// Returns `Error::RegionMismatch` (wrapped) if either image differs
    /// from the field's extent.
    pub fn correct_image(&self, image: &Image, output: &mut Image) -> FilterResult<()> {
        image.check_region(&self.spatial_dims)?;
        image.check_region(output.dims())?;

        let tables = self.spatial_weights();
        let ndim = self.spatial_dims.len();
        let mut weights = Vec::with_capacity(ndim + 1);
        let mut cursor = image.cursor();
        let out = output.data_mut();
        for (idx, &value) in image.data().iter().enumerate() {
            weights.clear();
            weights.extend(cursor.coord().iter().enumerate().map(|(axis, &c)| tables[axis][c]));
            weights.push(self.intensity_weights(value));
            out[idx] = self.apply(value, &weights);
            cursor.advance();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(components: BiasComponents) -> BiasField {
        let config = CorrectionConfig {
            components,
            ..Default::default()
        };
        BiasField::new(&[8, 6], (10.0, 200.0), &config).unwrap()
    }

    #[test]
    fn test_parameter_counts() {
        // 2 spatial axes + intensity, 4 control points per axis
        assert_eq!(field(BiasComponents::Additive).number_of_parameters(), 64);
        assert_eq!(field(BiasComponents::Multiplicative).number_of_parameters(), 64);
        let both = field(BiasComponents::Both);
        assert_eq!(both.number_of_parameters(), 128);
        assert_eq!(both.parameters_per_component(), 64);
    }

    #[test]
    fn test_set_parameters_wrong_length() {
        let mut f = field(BiasComponents::Both);
        let err = f.set_parameters(&[0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            FilterError::ParameterCountMismatch {
                expected: 128,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_parameters_round_trip_additive_first() {
        let mut f = field(BiasComponents::Both);
        let params: Vec<f64> = (0..128).map(|i| i as f64).collect();
        f.set_parameters(&params).unwrap();
        assert_eq!(f.parameters(), params);
        assert_eq!(f.additive().unwrap().coefficients()[0], 0.0);
        assert_eq!(f.multiplicative().unwrap().coefficients()[0], 64.0);
    }

    #[test]
    fn test_zero_field_is_identity() {
        let f = field(BiasComponents::Both);
        let image = Image::from_fn(&[8, 6], |c| 10.0 + (c[0] * 23 + c[1] * 7) as f64).unwrap();
        let mut out = image.create_template();
        f.correct_image(&image, &mut out).unwrap();
        assert_eq!(out.data(), image.data());
    }

    #[test]
    fn test_constant_additive_shift() {
        let mut f = field(BiasComponents::Additive);
        f.set_parameters(&[0.1; 64]).unwrap();
        let image = Image::new_with_value(&[8, 6], 50.0).unwrap();
        let mut out = image.create_template();
        f.correct_image(&image, &mut out).unwrap();
        // 0.1 scaled by the span (190)
        for &v in out.data() {
            assert!((v - 69.0).abs() < 1e-9, "{v}");
        }
    }

    #[test]
    fn test_constant_gain() {
        let mut f = field(BiasComponents::Multiplicative);
        f.set_parameters(&[1.0; 64]).unwrap();
        let image = Image::new_with_value(&[8, 6], 30.0).unwrap();
        let mut out = image.create_template();
        f.correct_image(&image, &mut out).unwrap();
        assert!(out.data().iter().all(|&v| (v - 60.0).abs() < 1e-9));
    }

    #[test]
    fn test_region_mismatch() {
        let f = field(BiasComponents::Both);
        let image = Image::new(&[8, 6]).unwrap();
        let mut out = Image::new(&[8, 5]).unwrap();
        assert!(matches!(
            f.correct_image(&image, &mut out),
            Err(FilterError::Core(Error::RegionMismatch { .. }))
        ));
    }

    #[test]
    fn test_components_from_str() {
        assert_eq!("Both".parse::<BiasComponents>().unwrap(), BiasComponents::Both);
        assert_eq!("mul".parse::<BiasComponents>().unwrap(), BiasComponents::Multiplicative);
        assert!("gain".parse::<BiasComponents>().is_err());
    }
}
