//! Error types for ebic-optim

use thiserror::Error;

/// Errors that can occur while configuring or running an optimizer
#[derive(Debug, Error)]
pub enum OptimError {
    /// Invalid optimizer settings
    #[error("invalid optimizer parameters: {0}")]
    InvalidParameters(String),

    /// The cost function has no parameters to optimize
    #[error("cost function has no parameters")]
    NoParameters,

    /// The initial position does not match the cost function
    #[error("initial position has {actual} parameters, cost function expects {expected}")]
    PositionLength { expected: usize, actual: usize },

    /// The cost function failed during evaluation
    #[error("cost function error: {0}")]
    Cost(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for optimizer operations
pub type OptimResult<T> = Result<T, OptimError>;
