//! Uniform B-spline control lattices
//!
//! A lattice of `mesh_size + order` control points per axis spans the
//! normalized domain `[0, 1]` of every axis. Evaluating the spline at a
//! point touches `(order + 1)^axes` coefficients; the per-axis weights are
//! computed once with [`basis_weights`] and reused.

use crate::error::{FilterError, FilterResult};

/// Highest supported spline order (cubic)
pub const MAX_SPLINE_ORDER: usize = 3;

/// Default spline order
pub const DEFAULT_SPLINE_ORDER: usize = 3;

/// Default number of mesh cells per axis
pub const DEFAULT_MESH_SIZE: usize = 1;

/// Non-zero basis weights along one axis
///
/// Control point `start + j` carries `weights[j]` for `j < len`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisWeights {
    /// First control point with a non-zero weight
    pub start: usize,
    /// Weights of control points `start..start + len`
    pub weights: [f64; MAX_SPLINE_ORDER + 1],
    /// Number of valid weights (`order + 1`)
    pub len: usize,
}

impl AxisWeights {
    /// The valid weights
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights[..self.len]
    }
}

/// Cardinal B-spline `N_{j,k}` on integer knots, evaluated at `u`
fn cardinal(j: usize, k: usize, u: f64) -> f64 {
    let jf = j as f64;
    if k == 0 {
        return if jf <= u && u < jf + 1.0 { 1.0 } else { 0.0 };
    }
    let kf = k as f64;
    (u - jf) / kf * cardinal(j, k - 1, u) + (jf + kf + 1.0 - u) / kf * cardinal(j + 1, k - 1, u)
}

/// Basis weights of a uniform spline at normalized coordinate `t`
///
/// `t` is clamped to `[0, 1]`; a non-finite `t` evaluates at 0. The
/// weights are non-negative and sum to one.
///
/// ```
/// use ebic_filter::bspline::basis_weights;
///
/// let w = basis_weights(3, 1, 0.0);
/// assert_eq!(w.start, 0);
/// assert!((w.weights()[1] - 4.0 / 6.0).abs() < 1e-12);
/// ```
pub fn basis_weights(order: usize, mesh_size: usize, t: f64) -> AxisWeights {
    let order = order.min(MAX_SPLINE_ORDER);
    let mesh_size = mesh_size.max(1);
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };

    let pos = t * mesh_size as f64;
    let cell = (pos.floor() as usize).min(mesh_size - 1);
    let u = pos - cell as f64;

    let mut weights = [0.0; MAX_SPLINE_ORDER + 1];
    if order == 0 {
        weights[0] = 1.0;
    } else {
        for (j, w) in weights.iter_mut().enumerate().take(order + 1) {
            *w = cardinal(j, order, u + order as f64);
        }
    }
    AxisWeights {
        start: cell,
        weights,
        len: order + 1,
    }
}

/// Coefficients of a tensor-product B-spline over `axes` axes
///
/// Coefficients are stored with axis 0 varying fastest, like image
/// samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlLattice {
    sizes: Vec<usize>,
    coefficients: Vec<f64>,
    order: usize,
    mesh_size: usize,
}

impl ControlLattice {
    /// Create a zero lattice
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidParameters` for zero axes, a zero mesh
    /// size or an order above [`MAX_SPLINE_ORDER`].
    pub fn new(axes: usize, mesh_size: usize, order: usize) -> FilterResult<Self> {
        if axes == 0 {
            return Err(FilterError::InvalidParameters(
                "lattice needs at least one axis".to_string(),
            ));
        }
        if mesh_size == 0 {
            return Err(FilterError::InvalidParameters(
                "mesh_size must be >= 1".to_string(),
            ));
        }
        if order > MAX_SPLINE_ORDER {
            return Err(FilterError::InvalidParameters(format!(
                "spline order {order} exceeds maximum {MAX_SPLINE_ORDER}"
            )));
        }
        let per_axis = mesh_size + order;
        let len = per_axis
            .checked_pow(axes as u32)
            .ok_or_else(|| FilterError::InvalidParameters("lattice too large".to_string()))?;
        Ok(ControlLattice {
            sizes: vec![per_axis; axes],
            coefficients: vec![0.0; len],
            order,
            mesh_size,
        })
    }

    /// Control points per axis
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Number of axes
    pub fn axes(&self) -> usize {
        self.sizes.len()
    }

    /// Number of coefficients
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Whether the lattice has no coefficients (never true once built)
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Spline order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Mesh cells per axis
    pub fn mesh_size(&self) -> usize {
        self.mesh_size
    }

    /// Coefficients in storage order
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Mutable coefficients in storage order
    pub fn coefficients_mut(&mut self) -> &mut [f64] {
        &mut self.coefficients
    }

    /// Basis weights of this lattice at normalized coordinate `t`
    pub fn weights_at(&self, t: f64) -> AxisWeights {
        basis_weights(self.order, self.mesh_size, t)
    }

    /// Evaluate the spline from precomputed per-axis weights
    ///
    /// `weights` must hold one entry per axis.
    pub fn evaluate(&self, weights: &[AxisWeights]) -> f64 {
        debug_assert_eq!(weights.len(), self.sizes.len());
        self.accumulate(weights, self.sizes.len() - 1, 0)
    }

    /// Evaluate the spline at normalized coordinates (one per axis)
    pub fn evaluate_at(&self, t: &[f64]) -> f64 {
        let weights: Vec<AxisWeights> = t.iter().map(|&t| self.weights_at(t)).collect();
        self.evaluate(&weights)
    }

    fn accumulate(&self, weights: &[AxisWeights], axis: usize, base: usize) -> f64 {
        let w = &weights[axis];
        let mut sum = 0.0;
        for (j, &wj) in w.weights().iter().enumerate() {
            if wj == 0.0 {
                continue;
            }
            let idx = base * self.sizes[axis] + w.start + j;
            let term = if axis == 0 {
                self.coefficients[idx]
            } else {
                self.accumulate(weights, axis - 1, idx)
            };
            sum += wj * term;
        }
        sum
    }
}
