//! Shannon entropy of a histogram
//!
//! Entropy is accumulated with a compensated sum: with many bins each
//! term `-p * log2(p)` is small, and naive accumulation loses the low-order
//! bits of the running total.

use std::ops::AddAssign;

/// Neumaier (Kahan-Babuska) compensated summation
///
/// ```
/// use ebic_core::CompensatedSum;
///
/// let mut sum = CompensatedSum::new();
/// sum.add(1.0);
/// sum.add(1e-16);
/// sum.add(-1.0);
/// assert_eq!(sum.sum(), 1e-16);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term
    #[inline]
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    /// Compensated total
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum + self.compensation
    }

    /// Reset to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl AddAssign<f64> for CompensatedSum {
    fn add_assign(&mut self, value: f64) {
        self.add(value);
    }
}

impl FromIterator<f64> for CompensatedSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut sum = CompensatedSum::new();
        for v in iter {
            sum.add(v);
        }
        sum
    }
}

/// Bins whose probability is at or below `SPARSE_BIN_FACTOR / total` are
/// skipped (fewer than one sample).
pub const SPARSE_BIN_FACTOR: f64 = 0.99;

/// Discrete Shannon entropy, in bits, of a histogram with `total` samples
///
/// Returns 0 for an empty histogram. Lower entropy means a more peaked
/// intensity distribution.
///
/// ```
/// use ebic_core::shannon_entropy;
///
/// assert_eq!(shannon_entropy(&[32, 32], 64), 1.0);
/// assert_eq!(shannon_entropy(&[64, 0, 0], 64), 0.0);
/// ```
pub fn shannon_entropy(counts: &[u64], total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let threshold = SPARSE_BIN_FACTOR / total;
    let mut entropy = CompensatedSum::new();
    for &count in counts {
        let probability = count as f64 / total;
        if probability > threshold {
            entropy += -probability * probability.log2();
        }
    }
    // -1 * log2(1) is -0.0
    entropy.sum().max(0.0)
}
