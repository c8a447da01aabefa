//! ebic - Entropy-based intensity bias correction
//!
//! Estimates a smooth additive and multiplicative intensity bias in an
//! n-dimensional image by minimizing the Shannon entropy of the corrected
//! image's intensity histogram, then removes it.
//!
//! # Overview
//!
//! - [`Image`], [`Mask`], [`Histogram`] - core containers and statistics
//! - [`filter`] - the bias model, the entropy cost and [`filter::correct`]
//! - [`optim`] - the derivative-free Powell optimizer
//! - [`io`] - PNG and PGM reading and writing
//!
//! # Example
//!
//! ```
//! use ebic::{Image, filter::{CorrectionConfig, correct}};
//!
//! let image = Image::from_fn(&[16, 16], |c| {
//!     let level = if c[0] < 8 { 40.0 } else { 160.0 };
//!     level * (0.9 + 0.2 * c[1] as f64 / 15.0)
//! })
//! .unwrap();
//! let result = correct(&image, None, &CorrectionConfig::default()).unwrap();
//! assert!(result.entropy <= result.initial_entropy);
//! ```

// Re-export core types (primary data structures used everywhere)
pub use ebic_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use ebic_filter as filter;
pub use ebic_io as io;
pub use ebic_optim as optim;
