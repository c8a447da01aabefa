//! ebic-optim - Derivative-free optimization
//!
//! This crate provides the optimizer that drives the bias field search:
//!
//! - [`CostFunction`] - single-valued objective over a flat parameter vector
//! - [`PowellOptimizer`] - Powell's conjugate-direction method with
//!   bracketing and Brent line searches
//! - [`StopCondition`] / [`OptimizationResult`] - how and where a run ended

pub mod cost;
mod error;
mod line;
pub mod powell;

pub use cost::CostFunction;
pub use error::{OptimError, OptimResult};
pub use powell::{
    IterationReport, OptimizationResult, PowellConfig, PowellOptimizer, StopCondition,
};
