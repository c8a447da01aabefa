//! ebic-filter - Entropy-based intensity bias correction
//!
//! A bias field with an additive and a multiplicative B-spline component is
//! estimated by minimizing the histogram entropy of the corrected image:
//!
//! - [`bspline`] - uniform B-spline weights and control lattices
//! - [`bias`] - the bias field model and its correction formula
//! - [`cost`] - [`EntropyCostFunction`], the optimizer objective
//! - [`correct()`] - end-to-end correction with a Powell search

pub mod bias;
pub mod bspline;
pub mod config;
pub mod correct;
pub mod cost;
mod error;

pub use bias::{BiasComponents, BiasField};
pub use bspline::{AxisWeights, ControlLattice, basis_weights};
pub use config::{CorrectionConfig, DEFAULT_MIN_SPAN_FRACTION};
pub use correct::{Correction, correct, correct_with_observer};
pub use cost::EntropyCostFunction;
pub use error::{FilterError, FilterResult};
