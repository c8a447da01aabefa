//! Histogram entropy of a bias-corrected image as an optimization cost
//!
//! The cost is the Shannon entropy of the intensity histogram of the
//! corrected samples. Parameter sets that break the image (non-finite
//! values, non-positive gain, or an intensity span collapsed below a
//! fraction of the input span) get the maximum entropy of the histogram
//! instead, so the optimizer cannot reach a trivial minimum by flattening
//! the image to a constant.

use crate::bias::BiasField;
use crate::bspline::AxisWeights;
use crate::config::CorrectionConfig;
use crate::error::{FilterError, FilterResult};
use ebic_core::{Error, Histogram, HistogramOptions, Image, Mask, sample_indices};
use ebic_optim::CostFunction;

/// Entropy of a corrected image as a function of the bias parameters
///
/// Construction plays the role of initialization: the mask extent is
/// checked, contributing samples are collected and their basis weights are
/// precomputed. The parameters start at zero, which is the identity
/// correction.
#[derive(Debug)]
pub struct EntropyCostFunction<'a> {
    image: &'a Image,
    field: BiasField,
    histogram: HistogramOptions,
    samples: Vec<usize>,
    /// `ndim + 1` weights per sample, spatial axes then intensity
    sample_weights: Vec<AxisWeights>,
    input_span: f64,
    min_span_fraction: f64,
    corrected: Vec<f64>,
    evaluations: usize,
}

impl<'a> EntropyCostFunction<'a> {
    /// Set up the cost for `image`, optionally restricted to `mask`
    ///
    /// # Errors
    ///
    /// Returns `Error::RegionMismatch` (wrapped) if the mask extent differs
    /// from the image extent, `Error::EmptyRegion` if no sample contributes,
    /// and `FilterError::InvalidParameters` for invalid settings.
    pub fn new(image: &'a Image, mask: Option<&Mask>, config: &CorrectionConfig) -> FilterResult<Self> {
        config.validate()?;
        let histogram = config.histogram_options();
        let samples = sample_indices(image, mask, histogram.sample_step, histogram.mask_label)?;
        let range = image
            .min_max()
            .ok_or(Error::EmptyRegion("image has no finite sample"))?;
        let field = BiasField::new(image.dims(), range, config)?;

        let ndim = image.ndim();
        let tables = field.spatial_weights();
        let mut sample_weights = Vec::with_capacity(samples.len() * (ndim + 1));
        let mut cursor = image.cursor();
        let mut idx = 0;
        for &sample in &samples {
            while idx < sample {
                cursor.advance();
                idx += 1;
            }
            sample_weights.extend(cursor.coord().iter().enumerate().map(|(axis, &c)| tables[axis][c]));
            sample_weights.push(field.intensity_weights(image.data()[sample]));
        }

        let (lo, hi) = samples
            .iter()
            .map(|&i| image.data()[i])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        tracing::debug!(
            samples = samples.len(),
            parameters = field.number_of_parameters(),
            bins = histogram.bins,
            "entropy cost function initialized"
        );

        Ok(EntropyCostFunction {
            image,
            field,
            histogram,
            corrected: Vec::with_capacity(samples.len()),
            samples,
            sample_weights,
            input_span: hi - lo,
            min_span_fraction: config.min_span_fraction,
            evaluations: 0,
        })
    }

    /// Value returned for degenerate parameter sets (`log2(bins)`)
    pub fn penalty(&self) -> f64 {
        (self.histogram.bins as f64).log2()
    }

    /// Number of contributing samples
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of `value` evaluations so far
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// The bias field at the current parameters
    pub fn bias_field(&self) -> &BiasField {
        &self.field
    }

    /// Current parameters
    pub fn parameters(&self) -> Vec<f64> {
        self.field.parameters()
    }

    /// Replace the current parameters without evaluating
    ///
    /// # Errors
    ///
    /// Returns `FilterError::ParameterCountMismatch` for a wrong length.
    pub fn set_parameters(&mut self, parameters: &[f64]) -> FilterResult<()> {
        self.field.set_parameters(parameters)
    }

    /// Gradient-based parameter updates are not supported
    ///
    /// # Errors
    ///
    /// Always returns `FilterError::DerivativesUnavailable`.
    pub fn update_parameters(&mut self, _derivative: &[f64], _factor: f64) -> FilterResult<()> {
        Err(FilterError::DerivativesUnavailable(
            "entropy cost cannot be updated along a gradient",
        ))
    }

    /// Write the image corrected with the current parameters into `output`
    ///
    /// # Errors
    ///
    /// Returns `Error::RegionMismatch` (wrapped) if `output` has a
    /// different extent than the input image.
    pub fn corrected_image(&self, output: &mut Image) -> FilterResult<()> {
        self.field.correct_image(self.image, output)
    }

    /// Entropy of the uncorrected contributing samples
    pub fn input_entropy(&self) -> FilterResult<f64> {
        let values: Vec<f64> = self.samples.iter().map(|&i| self.image.data()[i]).collect();
        Ok(Histogram::compute(&values, &self.histogram)?.entropy())
    }

    /// Fill `self.corrected`; false if the parameters are degenerate
    fn correct_samples(&mut self) -> bool {
        let image = self.image;
        let stride = image.ndim() + 1;
        let data = image.data();
        self.corrected.clear();
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for (&idx, weights) in self.samples.iter().zip(self.sample_weights.chunks_exact(stride)) {
            let (offset, gain) = self.field.field_at(weights);
            let v = data[idx] * gain + offset;
            if gain <= 0.0 || !v.is_finite() {
                return false;
            }
            lo = lo.min(v);
            hi = hi.max(v);
            self.corrected.push(v);
        }
        hi - lo >= self.min_span_fraction * self.input_span
    }
}

impl CostFunction for EntropyCostFunction<'_> {
    type Error = FilterError;

    fn number_of_parameters(&self) -> usize {
        self.field.number_of_parameters()
    }

    fn value(&mut self, parameters: &[f64]) -> FilterResult<f64> {
        self.field.set_parameters(parameters)?;
        self.evaluations += 1;
        if !self.correct_samples() {
            return Ok(self.penalty());
        }
        Ok(Histogram::compute(&self.corrected, &self.histogram)?.entropy())
    }

    fn derivative(&mut self, _parameters: &[f64]) -> FilterResult<Vec<f64>> {
        Err(FilterError::DerivativesUnavailable(
            "histogram entropy has no analytic derivative",
        ))
    }

    fn value_and_derivative(&mut self, _parameters: &[f64]) -> FilterResult<(f64, Vec<f64>)> {
        Err(FilterError::DerivativesUnavailable(
            "histogram entropy has no analytic derivative",
        ))
    }
}
