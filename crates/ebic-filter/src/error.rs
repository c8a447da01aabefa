//! Error types for ebic-filter

use ebic_optim::OptimError;
use thiserror::Error;

/// Errors that can occur during bias field estimation and correction
#[derive(Debug, Error)]
pub enum FilterError {
    /// Core library error (empty region, region mismatch, ...)
    #[error("core error: {0}")]
    Core(#[from] ebic_core::Error),

    /// Optimizer error
    #[error("optimizer error: {0}")]
    Optimizer(OptimError),

    /// A parameter vector of the wrong length was supplied
    #[error("parameter count mismatch: expected {expected}, got {actual}")]
    ParameterCountMismatch { expected: usize, actual: usize },

    /// A derivative was requested from a cost function that has none
    #[error("derivatives not available: {0}")]
    DerivativesUnavailable(&'static str),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl From<OptimError> for FilterError {
    /// Cost function failures come back boxed inside the optimizer error;
    /// unwrap them so callers see the original variant.
    fn from(err: OptimError) -> Self {
        match err {
            OptimError::Cost(source) => match source.downcast::<FilterError>() {
                Ok(inner) => *inner,
                Err(source) => FilterError::Optimizer(OptimError::Cost(source)),
            },
            other => FilterError::Optimizer(other),
        }
    }
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
