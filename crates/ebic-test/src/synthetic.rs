//! Synthetic images for tests
//!
//! Small images with known intensity distributions, so entropies and
//! corrections can be checked against closed-form values.

use crate::error::TestResult;
use ebic_core::{Image, Mask};

/// Image whose left half (x < width / 2) is `low` and right half `high`
pub fn two_level_image(width: usize, height: usize, low: f64, high: f64) -> TestResult<Image> {
    Ok(Image::from_fn(&[width, height], |c| {
        if c[0] < width / 2 { low } else { high }
    })?)
}

/// Multiplicative gain that ramps linearly along y from `1 - span / 2` to
/// `1 + span / 2`
pub fn vertical_gain(height: usize, y: usize, span: f64) -> f64 {
    let t = if height > 1 {
        y as f64 / (height - 1) as f64
    } else {
        0.5
    };
    1.0 + span * (t - 0.5)
}

/// [`two_level_image`] multiplied by [`vertical_gain`]
pub fn biased_two_level_image(
    width: usize,
    height: usize,
    low: f64,
    high: f64,
    gain_span: f64,
) -> TestResult<Image> {
    Ok(Image::from_fn(&[width, height], |c| {
        let v = if c[0] < width / 2 { low } else { high };
        v * vertical_gain(height, c[1], gain_span)
    })?)
}

/// Image whose samples are their own linear index
pub fn ramp_image(dims: &[usize]) -> TestResult<Image> {
    let mut i = 0.0;
    Ok(Image::from_fn(dims, |_| {
        let v = i;
        i += 1.0;
        v
    })?)
}

/// Mask labelling a centered disk with `label` and everything else 0
pub fn disk_mask(width: usize, height: usize, radius: f64, label: u8) -> TestResult<Mask> {
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;
    Ok(Mask::from_fn(&[width, height], |c| {
        let dx = c[0] as f64 - cx;
        let dy = c[1] as f64 - cy;
        if dx * dx + dy * dy <= radius * radius {
            label
        } else {
            0
        }
    })?)
}
