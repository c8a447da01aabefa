//! Entropy-minimizing bias correction
//!
//! Starting from the identity field, a Powell search adjusts the bias
//! coefficients to minimize the histogram entropy of the corrected image.
//! The image corrected with the best coefficients found is returned along
//! with the run statistics.

use crate::config::CorrectionConfig;
use crate::cost::EntropyCostFunction;
use crate::error::FilterResult;
use ebic_core::{Image, Mask};
use ebic_optim::{CostFunction, IterationReport, PowellOptimizer, StopCondition};

/// Outcome of [`correct`]
#[derive(Debug, Clone)]
pub struct Correction {
    /// Corrected image (same extent as the input)
    pub image: Image,
    /// Best bias coefficients, additive block first
    pub parameters: Vec<f64>,
    /// Entropy of the corrected samples
    pub entropy: f64,
    /// Entropy of the uncorrected samples
    pub initial_entropy: f64,
    /// Powell iterations performed
    pub iterations: usize,
    /// Cost evaluations performed
    pub evaluations: usize,
    /// Why the optimizer stopped
    pub stop_condition: StopCondition,
}

/// Correct the intensity bias of `image` by entropy minimization
///
/// Only samples inside `mask` (if given) drive the estimate; the whole
/// image is corrected.
///
/// # Errors
///
/// Fails for invalid settings, a mask of another extent, an empty sample
/// region, or a failing cost evaluation.
///
/// ```
/// use ebic_core::Image;
/// use ebic_filter::{CorrectionConfig, correct};
///
/// let image = Image::from_fn(&[16, 16], |c| if c[0] < 8 { 50.0 } else { 150.0 }).unwrap();
/// let result = correct(&image, None, &CorrectionConfig::default()).unwrap();
/// assert_eq!(result.image.dims(), image.dims());
/// assert!(result.entropy <= result.initial_entropy);
/// ```
pub fn correct(image: &Image, mask: Option<&Mask>, config: &CorrectionConfig) -> FilterResult<Correction> {
    correct_with_observer(image, mask, config, |_| {})
}

/// Like [`correct`], calling `observer` after every optimizer iteration
pub fn correct_with_observer(
    image: &Image,
    mask: Option<&Mask>,
    config: &CorrectionConfig,
    observer: impl FnMut(&IterationReport),
) -> FilterResult<Correction> {
    config.validate()?;
    let optimizer = PowellOptimizer::new(config.optimizer)?;
    let mut cost = EntropyCostFunction::new(image, mask, config)?;
    let initial = vec![0.0; cost.number_of_parameters()];

    tracing::info!(
        dims = ?image.dims(),
        samples = cost.sample_count(),
        parameters = initial.len(),
        components = %config.components,
        "starting bias correction"
    );

    let result = optimizer.optimize_with_observer(&mut cost, &initial, observer)?;

    cost.set_parameters(&result.position)?;
    let mut output = image.create_template();
    cost.corrected_image(&mut output)?;

    tracing::info!(
        initial_entropy = result.initial_value,
        entropy = result.value,
        iterations = result.iterations,
        evaluations = result.evaluations,
        stop = %result.stop_condition,
        "bias correction finished"
    );

    Ok(Correction {
        image: output,
        parameters: result.position,
        entropy: result.value,
        initial_entropy: result.initial_value,
        iterations: result.iterations,
        evaluations: result.evaluations,
        stop_condition: result.stop_condition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use ebic_core::Error;

    #[test]
    fn test_constant_image_stays_put() {
        let image = Image::new_with_value(&[6, 6], 42.0).unwrap();
        let result = correct(&image, None, &CorrectionConfig::default()).unwrap();
        assert_eq!(result.initial_entropy, 0.0);
        assert_eq!(result.entropy, 0.0);
        assert_eq!(result.image.data(), image.data());
    }

    #[test]
    fn test_observer_sees_every_iteration() {
        let image = Image::from_fn(&[8, 8], |c| (c[0] * 8 + c[1]) as f64).unwrap();
        let mut config = CorrectionConfig::default();
        config.optimizer.max_iterations = 2;
        let mut seen = Vec::new();
        let result = correct_with_observer(&image, None, &config, |r| seen.push(r.iteration)).unwrap();
        assert_eq!(seen.len(), result.iterations);
        assert!(result.iterations <= 2);
        assert!(result.entropy <= result.initial_entropy);
    }

    #[test]
    fn test_mask_mismatch() {
        let image = Image::new(&[4, 4]).unwrap();
        let mask = Mask::filled(&[4, 5], 1).unwrap();
        let err = correct(&image, Some(&mask), &CorrectionConfig::default()).unwrap_err();
        assert!(matches!(err, FilterError::Core(Error::RegionMismatch { .. })));
    }

    #[test]
    fn test_invalid_config() {
        let image = Image::new(&[4, 4]).unwrap();
        let mut config = CorrectionConfig::default();
        config.optimizer.step_length = 0.0;
        assert!(matches!(
            correct(&image, None, &config),
            Err(FilterError::Optimizer(_))
        ));
    }
}
