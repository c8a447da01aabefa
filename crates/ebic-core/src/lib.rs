//! ebic-core - Basic data structures for entropy-based intensity correction
//!
//! This crate provides the containers and statistics shared by the rest of
//! the workspace:
//!
//! - [`Image`] - n-dimensional floating-point image (axis 0 fastest)
//! - [`Mask`] - same-shape label mask restricting contributing samples
//! - [`Histogram`] - fixed-bin intensity histogram with auto-detected range
//! - [`shannon_entropy`] / [`CompensatedSum`] - histogram entropy in bits

pub mod entropy;
pub mod error;
pub mod histogram;
pub mod image;
pub mod mask;

pub use entropy::{CompensatedSum, SPARSE_BIN_FACTOR, shannon_entropy};
pub use error::{Error, Result};
pub use histogram::{
    DEFAULT_BINS, DEFAULT_MARGINAL_SCALE, Histogram, HistogramOptions, sample_indices,
};
pub use image::{Image, IndexCursor};
pub use mask::Mask;
