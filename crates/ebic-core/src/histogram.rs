//! Fixed-bin intensity histograms
//!
//! Functions to compute the intensity distribution of an image, optionally
//! restricted to a mask and subsampled on a regular grid.
//!
//! With an auto-detected range the upper bound is pushed past the maximum
//! by `(max - min) / (bins * marginal_scale)`, so the maximum falls inside
//! the last bin instead of on its upper edge.

use crate::entropy::shannon_entropy;
use crate::error::{Error, Result};
use crate::image::{Image, IndexCursor, finite_min_max};
use crate::mask::Mask;

/// Default number of histogram bins
pub const DEFAULT_BINS: usize = 32;

/// Default marginal scale for auto-detected ranges
pub const DEFAULT_MARGINAL_SCALE: f64 = 10.0;

/// Options for histogram estimation
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramOptions {
    /// Number of bins (>= 1)
    pub bins: usize,
    /// Explicit `[lo, hi)` range; auto-detected from the samples when `None`
    pub range: Option<(f64, f64)>,
    /// Divisor for the margin added above an auto-detected maximum (> 0)
    pub marginal_scale: f64,
    /// Subsampling step along every axis (1 = every sample)
    pub sample_step: usize,
    /// Mask label selecting contributing samples; `None` = any non-zero label
    pub mask_label: Option<u8>,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            range: None,
            marginal_scale: DEFAULT_MARGINAL_SCALE,
            sample_step: 1,
            mask_label: None,
        }
    }
}

impl HistogramOptions {
    /// Options with `bins` bins and defaults otherwise
    pub fn with_bins(bins: usize) -> Self {
        Self {
            bins,
            ..Self::default()
        }
    }

    /// Check the options for consistency
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` for a zero bin count, a zero
    /// sample step, a non-positive marginal scale or an empty range.
    pub fn validate(&self) -> Result<()> {
        if self.bins == 0 {
            return Err(Error::InvalidParameter("bins must be >= 1".to_string()));
        }
        if self.sample_step == 0 {
            return Err(Error::InvalidParameter(
                "sample_step must be >= 1".to_string(),
            ));
        }
        if !(self.marginal_scale > 0.0 && self.marginal_scale.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "marginal_scale must be positive, got {}",
                self.marginal_scale
            )));
        }
        if let Some((lo, hi)) = self.range
            && !(lo.is_finite() && hi.is_finite() && hi > lo)
        {
            return Err(Error::InvalidParameter(format!(
                "histogram range [{lo}, {hi}) is empty"
            )));
        }
        Ok(())
    }
}

/// Fixed-bin histogram of sample intensities
///
/// Invariant: `counts().iter().sum() == total()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    counts: Vec<u64>,
    lower: f64,
    upper: f64,
    total: u64,
}

impl Histogram {
    /// Build a histogram from raw samples
    ///
    /// Non-finite samples are ignored. Samples outside an explicit range
    /// are clamped into the first or last bin.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyRegion` if no finite sample remains, or
    /// `Error::InvalidParameter` if the options are invalid.
    pub fn compute(samples: &[f64], options: &HistogramOptions) -> Result<Self> {
        options.validate()?;
        let (lower, upper) = match options.range {
            Some(range) => range,
            None => {
                let (min, max) = finite_min_max(samples.iter().copied())
                    .ok_or(Error::EmptyRegion("no finite samples"))?;
                let margin = (max - min) / (options.bins as f64 * options.marginal_scale);
                (min, max + margin)
            }
        };

        let mut histogram = Histogram {
            counts: vec![0; options.bins],
            lower,
            upper,
            total: 0,
        };
        for &v in samples.iter().filter(|v| v.is_finite()) {
            let bin = histogram.bin_index(v);
            histogram.counts[bin] += 1;
            histogram.total += 1;
        }
        if histogram.total == 0 {
            return Err(Error::EmptyRegion("no finite samples"));
        }
        Ok(histogram)
    }

    /// Build a histogram over the contributing samples of an image
    ///
    /// # Errors
    ///
    /// Returns `Error::RegionMismatch` if the mask extent differs from the
    /// image extent and `Error::EmptyRegion` if no sample contributes.
    pub fn from_image(image: &Image, mask: Option<&Mask>, options: &HistogramOptions) -> Result<Self> {
        options.validate()?;
        let indices = sample_indices(image, mask, options.sample_step, options.mask_label)?;
        let samples: Vec<f64> = indices.iter().map(|&i| image.data()[i]).collect();
        Self::compute(&samples, options)
    }

    /// Bin index for a value (clamped to the valid bins)
    pub fn bin_index(&self, value: f64) -> usize {
        let bins = self.counts.len();
        let span = self.upper - self.lower;
        if span <= 0.0 {
            return 0;
        }
        let pos = ((value - self.lower) / span * bins as f64).floor();
        if pos <= 0.0 {
            0
        } else {
            (pos as usize).min(bins - 1)
        }
    }

    /// Bin counts
    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of bins
    #[inline]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Total number of samples
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Lower bound of the first bin
    #[inline]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper bound of the last bin
    #[inline]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Width of one bin
    pub fn bin_width(&self) -> f64 {
        (self.upper - self.lower) / self.counts.len() as f64
    }

    /// Lower bound of bin `i`
    pub fn bin_lower_bound(&self, i: usize) -> f64 {
        self.lower + i as f64 * self.bin_width()
    }

    /// Number of bins with at least one sample
    pub fn nonempty_bins(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Shannon entropy of the histogram, in bits
    pub fn entropy(&self) -> f64 {
        shannon_entropy(&self.counts, self.total)
    }
}

/// Linear indices of the samples that contribute to a histogram
///
/// A sample contributes when it is finite, lies inside the mask (if any)
/// and every coordinate is a multiple of `step`.
///
/// # Errors
///
/// Returns `Error::RegionMismatch` for a mask of a different extent,
/// `Error::InvalidParameter` for a zero step and `Error::EmptyRegion` if
/// nothing contributes.
pub fn sample_indices(
    image: &Image,
    mask: Option<&Mask>,
    step: usize,
    label: Option<u8>,
) -> Result<Vec<usize>> {
    if step == 0 {
        return Err(Error::InvalidParameter(
            "sample_step must be >= 1".to_string(),
        ));
    }
    if let Some(mask) = mask {
        mask.check_region(image)?;
    }

    let mut indices = Vec::new();
    let mut cursor = IndexCursor::new(image.dims());
    let mut idx = 0;
    loop {
        let on_grid = step == 1 || cursor.coord().iter().all(|&c| c % step == 0);
        let inside = mask.is_none_or(|m| m.is_inside(idx, label));
        if on_grid && inside && image.data()[idx].is_finite() {
            indices.push(idx);
        }
        idx += 1;
        if !cursor.advance() {
            break;
        }
    }

    if indices.is_empty() {
        return Err(Error::EmptyRegion("no sample inside the mask"));
    }
    Ok(indices)
}
