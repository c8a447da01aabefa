//! Entropy-based correction regression test
//!
//! Tests the entropy cost function contract and end-to-end correction of
//! synthetically biased images.

use ebic_core::{Error, Histogram, HistogramOptions, Image, Mask};
use ebic_filter::{
    BiasComponents, CorrectionConfig, EntropyCostFunction, FilterError, correct,
    correct_with_observer,
};
use ebic_io::ImageFormat;
use ebic_optim::{CostFunction, StopCondition};
use ebic_test::RegParams;
use ebic_test::synthetic::{biased_two_level_image, disk_mask, two_level_image};

/// Settings under which the biased test images are corrected
fn converging_config() -> CorrectionConfig {
    let mut config = CorrectionConfig {
        components: BiasComponents::Multiplicative,
        sample_step: 1,
        ..CorrectionConfig::default()
    };
    config.optimizer.max_iterations = 10;
    config
}

/// Small, fast settings for end-to-end runs
///
/// Subsampling by 2 leaves the entropy flat around the identity field on
/// the biased test images, so these only exercise the pipeline.
fn quick_config() -> CorrectionConfig {
    let mut config = CorrectionConfig {
        components: BiasComponents::Multiplicative,
        sample_step: 2,
        ..CorrectionConfig::default()
    };
    config.optimizer.max_iterations = 2;
    config
}

// ==========================================================================
// Test 1: Cost function contract
// ==========================================================================

#[test]
fn correct_reg_cost_function() {
    let mut rp = RegParams::new("correct_cost");

    let image = two_level_image(8, 8, 10.0, 200.0).unwrap();
    let config = CorrectionConfig::default();
    let mut cost = EntropyCostFunction::new(&image, None, &config).unwrap();

    // Zero parameters: the entropy of the input itself
    let zeros = vec![0.0; cost.number_of_parameters()];
    rp.compare_values(1.0, cost.value(&zeros).unwrap(), 0.0);
    rp.compare_values(64.0, cost.sample_count() as f64, 0.0);

    // Derivative queries always fail
    rp.check(
        matches!(cost.derivative(&zeros), Err(FilterError::DerivativesUnavailable(_))),
        "derivative unavailable",
    );
    rp.check(
        matches!(
            cost.value_and_derivative(&zeros),
            Err(FilterError::DerivativesUnavailable(_))
        ),
        "value and derivative unavailable",
    );
    rp.check(!cost.has_local_support(), "no local support");

    // Wrong parameter vector length
    rp.check(
        matches!(
            cost.value(&zeros[1..]),
            Err(FilterError::ParameterCountMismatch { .. })
        ),
        "parameter count mismatch",
    );

    // Mask extent is checked at setup
    let mask = Mask::filled(&[8, 4], 1).unwrap();
    rp.check(
        matches!(
            EntropyCostFunction::new(&image, Some(&mask), &config),
            Err(FilterError::Core(Error::RegionMismatch { .. }))
        ),
        "mask extent mismatch",
    );

    // Output extent is checked when materializing
    let mut wrong = Image::new(&[4, 8]).unwrap();
    rp.check(
        matches!(
            cost.corrected_image(&mut wrong),
            Err(FilterError::Core(Error::RegionMismatch { .. }))
        ),
        "output extent mismatch",
    );

    assert!(rp.cleanup(), "correct_reg cost function tests failed");
}

// ==========================================================================
// Test 2: Biased two-level image
// ==========================================================================

#[test]
fn correct_reg_biased_image() {
    let mut rp = RegParams::new("correct_biased");

    let image = biased_two_level_image(32, 32, 60.0, 180.0, 0.6).unwrap();
    let config = converging_config();

    let mut iterations_seen = 0;
    let result = correct_with_observer(&image, None, &config, |_| iterations_seen += 1).unwrap();

    rp.compare_values(image.len() as f64, result.image.len() as f64, 0.0);
    rp.check(result.image.dims() == image.dims(), "output extent");
    rp.check(
        result.entropy < result.initial_entropy,
        "entropy decreases on a biased image",
    );
    rp.compare_values(result.iterations as f64, iterations_seen as f64, 0.0);
    rp.check(result.iterations <= 10, "iteration cap respected");
    rp.check(result.evaluations > 0, "cost evaluated");
    rp.check(
        result.parameters.iter().any(|&p| p != 0.0),
        "bias field moved off the identity",
    );

    // The reported entropy is that of the returned image
    let options = HistogramOptions {
        sample_step: config.sample_step,
        ..HistogramOptions::with_bins(config.bins)
    };
    let measured = Histogram::from_image(&result.image, None, &options)
        .unwrap()
        .entropy();
    rp.compare_values(result.entropy, measured, 1e-9);

    // A mask selecting every sample drives the same correction
    let full = Mask::filled(image.dims(), 1).unwrap();
    let masked_config = CorrectionConfig {
        mask_label: Some(1),
        ..converging_config()
    };
    let masked = correct(&image, Some(&full), &masked_config).unwrap();
    rp.check(
        masked.entropy < masked.initial_entropy,
        "masked entropy decreases on a biased image",
    );
    rp.check(masked.parameters == result.parameters, "same coefficients as unmasked");
    rp.compare_images(&result.image, &masked.image, 0.0);

    if rp.display() {
        rp.write_image_and_check(&image, ImageFormat::Png).unwrap();
        rp.write_image_and_check(&result.image, ImageFormat::Png).unwrap();
    }

    assert!(rp.cleanup(), "correct_reg biased image tests failed");
}

// ==========================================================================
// Test 3: Entropy plateau around the identity field
// ==========================================================================

#[test]
fn correct_reg_plateau() {
    let mut rp = RegParams::new("correct_plateau");

    // Subsampled by 2, no line search finds a strictly lower entropy, so the
    // first sweep ends where it started
    let image = biased_two_level_image(32, 32, 60.0, 180.0, 0.6).unwrap();
    let result = correct(&image, None, &quick_config()).unwrap();

    rp.compare_values(result.initial_entropy, result.entropy, 0.0);
    rp.check(result.parameters.iter().all(|&p| p == 0.0), "identity field kept");
    rp.compare_values(1.0, result.iterations as f64, 0.0);
    rp.check(
        result.stop_condition == StopCondition::ValueTolerance,
        "stops on the value tolerance",
    );
    rp.compare_images(&image, &result.image, 0.0);

    assert!(rp.cleanup(), "correct_reg plateau tests failed");
}

// ==========================================================================
// Test 4: Masked correction
// ==========================================================================

#[test]
fn correct_reg_masked() {
    let mut rp = RegParams::new("correct_masked");

    let image = biased_two_level_image(24, 24, 50.0, 150.0, 0.5).unwrap();
    let mask = disk_mask(24, 24, 10.0, 1).unwrap();
    let config = CorrectionConfig {
        mask_label: Some(1),
        ..quick_config()
    };

    let result = correct(&image, Some(&mask), &config).unwrap();
    rp.check(result.image.dims() == image.dims(), "output extent");
    rp.check(result.entropy <= result.initial_entropy, "never worse than the input");
    rp.check(result.image.data().iter().all(|v| v.is_finite()), "finite output");

    // A label that is absent leaves nothing to measure
    let missing = CorrectionConfig {
        mask_label: Some(9),
        ..quick_config()
    };
    rp.check(
        matches!(
            correct(&image, Some(&mask), &missing),
            Err(FilterError::Core(Error::EmptyRegion(_)))
        ),
        "empty region",
    );

    assert!(rp.cleanup(), "correct_reg masked tests failed");
}

// ==========================================================================
// Test 5: Degenerate inputs
// ==========================================================================

#[test]
fn correct_reg_degenerate() {
    let mut rp = RegParams::new("correct_degenerate");

    // A constant image is already optimal and comes back unchanged
    let flat = Image::new_with_value(&[10, 10], 77.0).unwrap();
    let result = correct(&flat, None, &quick_config()).unwrap();
    rp.compare_values(0.0, result.initial_entropy, 0.0);
    rp.compare_values(0.0, result.entropy, 0.0);
    rp.compare_images(&flat, &result.image, 0.0);

    // Additive-only correction of a 3-D volume
    let volume = Image::from_fn(&[6, 6, 6], |c| {
        let level = if c[0] < 3 { 20.0 } else { 80.0 };
        level + 4.0 * c[2] as f64
    })
    .unwrap();
    let config = CorrectionConfig {
        components: BiasComponents::Additive,
        ..quick_config()
    };
    let result = correct(&volume, None, &config).unwrap();
    // (mesh + order)^(3 + 1) coefficients
    rp.compare_values(256.0, result.parameters.len() as f64, 0.0);
    rp.check(result.entropy <= result.initial_entropy, "never worse than the input");

    assert!(rp.cleanup(), "correct_reg degenerate tests failed");
}
