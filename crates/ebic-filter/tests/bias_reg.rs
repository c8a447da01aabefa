//! Bias field regression test
//!
//! Tests the B-spline lattice, the parameter layout of the bias field and
//! the exact identity of the zero field.

use ebic_core::{Error, Image};
use ebic_filter::{
    BiasComponents, BiasField, ControlLattice, CorrectionConfig, FilterError, basis_weights,
};
use ebic_test::RegParams;
use ebic_test::synthetic::ramp_image;

fn config(components: BiasComponents, mesh_size: usize, spline_order: usize) -> CorrectionConfig {
    CorrectionConfig {
        components,
        mesh_size,
        spline_order,
        ..CorrectionConfig::default()
    }
}

// ==========================================================================
// Test 1: Lattice evaluation
// ==========================================================================

#[test]
fn bias_reg_lattice() {
    let mut rp = RegParams::new("bias_lattice");

    // Weights form a partition of unity for every order and mesh
    let mut worst: f64 = 0.0;
    for order in 0..=3 {
        for mesh in 1..=4 {
            for i in 0..=64 {
                let w = basis_weights(order, mesh, i as f64 / 64.0);
                worst = worst.max((w.weights().iter().sum::<f64>() - 1.0).abs());
            }
        }
    }
    rp.compare_values(0.0, worst, 1e-12);

    // A linear lattice reproduces a plane exactly
    let mut lattice = ControlLattice::new(2, 2, 1).unwrap();
    let sizes = lattice.sizes().to_vec();
    for j in 0..sizes[1] {
        for i in 0..sizes[0] {
            lattice.coefficients_mut()[i + sizes[0] * j] = 2.0 * i as f64 - j as f64;
        }
    }
    // Control point i sits at t = i / mesh
    let value = lattice.evaluate_at(&[0.75, 0.25]);
    rp.compare_values(2.0 * 1.5 - 0.5, value, 1e-12);

    // Cubic lattice with constant coefficients stays constant
    let mut lattice = ControlLattice::new(3, 1, 3).unwrap();
    lattice.coefficients_mut().fill(-0.3);
    rp.compare_values(-0.3, lattice.evaluate_at(&[0.1, 0.5, 0.9]), 1e-12);

    assert!(rp.cleanup(), "bias_reg lattice tests failed");
}

// ==========================================================================
// Test 2: Parameter layout
// ==========================================================================

#[test]
fn bias_reg_parameters() {
    let mut rp = RegParams::new("bias_parameters");

    // Per component: (mesh + order)^(ndim + 1)
    let cases = [
        (&[16usize, 16][..], BiasComponents::Both, 1, 3, 2 * 64),
        (&[16, 16][..], BiasComponents::Additive, 1, 3, 64),
        (&[8, 8, 8][..], BiasComponents::Multiplicative, 1, 3, 256),
        (&[32][..], BiasComponents::Both, 2, 1, 2 * 9),
    ];
    for (dims, components, mesh, order, expected) in cases {
        let field = BiasField::new(dims, (0.0, 1.0), &config(components, mesh, order)).unwrap();
        rp.compare_values(expected as f64, field.number_of_parameters() as f64, 0.0);
        rp.compare_values(0.0, field.parameters().iter().map(|p| p.abs()).sum(), 0.0);
    }

    let mut field = BiasField::new(&[4, 4], (0.0, 1.0), &config(BiasComponents::Both, 1, 3)).unwrap();
    let result = field.set_parameters(&[0.0; 127]);
    rp.check(
        matches!(
            result,
            Err(FilterError::ParameterCountMismatch {
                expected: 128,
                actual: 127
            })
        ),
        "wrong parameter length",
    );

    assert!(rp.cleanup(), "bias_reg parameter tests failed");
}

// ==========================================================================
// Test 3: Correction formula
// ==========================================================================

#[test]
fn bias_reg_correction() {
    let mut rp = RegParams::new("bias_correction");

    let image = ramp_image(&[6, 5, 4]).unwrap();
    let (lo, hi) = image.min_max().unwrap();

    // Zero field: output equals input exactly
    let field = BiasField::new(image.dims(), (lo, hi), &config(BiasComponents::Both, 1, 3)).unwrap();
    let mut out = image.create_template();
    field.correct_image(&image, &mut out).unwrap();
    rp.compare_images(&image, &out, 0.0);

    // Constant gain and offset: v' = v * (1 + m) + span * a
    let mut field = field;
    let n = field.parameters_per_component();
    let mut params = vec![0.05; n];
    params.extend(std::iter::repeat_n(-0.5, n));
    field.set_parameters(&params).unwrap();
    field.correct_image(&image, &mut out).unwrap();
    let expected = Image::from_data(
        image.dims(),
        image.data().iter().map(|v| v * 0.5 + 0.05 * (hi - lo)).collect(),
    )
    .unwrap();
    rp.compare_images(&expected, &out, 1e-9);

    // Without normalization the offset is absolute
    let raw = CorrectionConfig {
        normalize_intensities: false,
        ..config(BiasComponents::Additive, 1, 3)
    };
    let mut field = BiasField::new(image.dims(), (lo, hi), &raw).unwrap();
    field.set_parameters(&vec![2.0; field.number_of_parameters()]).unwrap();
    field.correct_image(&image, &mut out).unwrap();
    rp.compare_values(image.data()[7] + 2.0, out.data()[7], 1e-9);

    // Output extent must match
    let mut wrong = Image::new(&[6, 5, 3]).unwrap();
    let result = field.correct_image(&image, &mut wrong);
    rp.check(
        matches!(result, Err(FilterError::Core(Error::RegionMismatch { .. }))),
        "output extent mismatch",
    );

    assert!(rp.cleanup(), "bias_reg correction tests failed");
}
