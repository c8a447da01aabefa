//! Error types for ebic-core
//!
//! Provides a unified error type for the image, mask and histogram
//! containers. Each variant carries enough context to explain which
//! precondition was violated.

use thiserror::Error;

/// ebic-core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid image extent (no axes, or an axis of length zero)
    #[error("invalid image dimensions: {0:?}")]
    InvalidDimension(Vec<usize>),

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A histogram or cost was requested over a region with no samples
    #[error("empty region: {0}")]
    EmptyRegion(&'static str),

    /// Two images (or an image and a mask) do not share the same region
    #[error("region mismatch: expected {expected:?}, got {actual:?}")]
    RegionMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Result type alias for ebic-core operations
pub type Result<T> = std::result::Result<T, Error>;
