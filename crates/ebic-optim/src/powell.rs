//! Powell's conjugate-direction method
//!
//! Each iteration performs one line minimization along every direction of
//! the current direction set, then tries the extrapolated overall
//! displacement as a new direction, replacing the direction along which
//! the largest decrease happened when Powell's test allows it. Only cost
//! values are used, never derivatives.
//!
//! # Example
//!
//! ```
//! use ebic_optim::{CostFunction, PowellConfig, PowellOptimizer};
//! use std::convert::Infallible;
//!
//! struct Bowl;
//!
//! impl CostFunction for Bowl {
//!     type Error = Infallible;
//!     fn number_of_parameters(&self) -> usize { 2 }
//!     fn value(&mut self, p: &[f64]) -> Result<f64, Infallible> {
//!         Ok((p[0] - 1.0).powi(2) + (p[1] + 2.0).powi(2))
//!     }
//!     fn derivative(&mut self, p: &[f64]) -> Result<Vec<f64>, Infallible> {
//!         Ok(vec![2.0 * (p[0] - 1.0), 2.0 * (p[1] + 2.0)])
//!     }
//! }
//!
//! let optimizer = PowellOptimizer::new(PowellConfig::default()).unwrap();
//! let result = optimizer.optimize(&mut Bowl, &[0.0, 0.0]).unwrap();
//! assert!((result.position[0] - 1.0).abs() < 1e-2);
//! assert!((result.position[1] + 2.0).abs() < 1e-2);
//! ```

use crate::cost::CostFunction;
use crate::error::{OptimError, OptimResult};
use crate::line::line_minimize;
use serde::{Deserialize, Serialize};

/// Default iteration cap
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Default initial step length of every line search
pub const DEFAULT_STEP_LENGTH: f64 = 0.1;

/// Default step tolerance
pub const DEFAULT_STEP_TOLERANCE: f64 = 1e-3;

/// Default relative value tolerance
pub const DEFAULT_VALUE_TOLERANCE: f64 = 1e-6;

/// Default evaluation budget of one line search phase
pub const DEFAULT_MAX_LINE_ITERATIONS: usize = 20;

/// Settings for [`PowellOptimizer`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowellConfig {
    /// Maximum number of Powell iterations (sweeps over all directions)
    pub max_iterations: usize,
    /// Initial trial step of every line search
    pub step_length: f64,
    /// Line searches stop when the bracket is narrower than this (scaled
    /// by `1 + |step|`); the optimizer stops when no parameter moved more
    /// than this during an iteration
    pub step_tolerance: f64,
    /// Stop when the relative decrease of an iteration falls below this
    pub value_tolerance: f64,
    /// Evaluation budget of the bracketing and of the refinement phase of
    /// a single line search
    pub max_line_iterations: usize,
}

impl Default for PowellConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            step_length: DEFAULT_STEP_LENGTH,
            step_tolerance: DEFAULT_STEP_TOLERANCE,
            value_tolerance: DEFAULT_VALUE_TOLERANCE,
            max_line_iterations: DEFAULT_MAX_LINE_ITERATIONS,
        }
    }
}

impl PowellConfig {
    /// Check the settings
    ///
    /// # Errors
    ///
    /// Returns `OptimError::InvalidParameters` when a length or tolerance
    /// is not positive and finite, or a budget is zero.
    pub fn validate(&self) -> OptimResult<()> {
        let positive = |name: &str, v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(OptimError::InvalidParameters(format!(
                    "{name} must be positive and finite, got {v}"
                )))
            }
        };
        positive("step_length", self.step_length)?;
        positive("step_tolerance", self.step_tolerance)?;
        if !(self.value_tolerance >= 0.0 && self.value_tolerance.is_finite()) {
            return Err(OptimError::InvalidParameters(format!(
                "value_tolerance must be non-negative, got {}",
                self.value_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(OptimError::InvalidParameters(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        if self.max_line_iterations < 3 {
            return Err(OptimError::InvalidParameters(
                "max_line_iterations must be >= 3".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why an optimization run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCondition {
    /// The iteration cap was reached
    MaximumIterations,
    /// No parameter moved more than the step tolerance in an iteration
    StepTolerance,
    /// The relative decrease of an iteration fell below the value tolerance
    ValueTolerance,
}

impl StopCondition {
    /// Human-readable description of the stop condition
    pub fn description(&self) -> &'static str {
        match self {
            Self::MaximumIterations => "Maximum number of iterations exceeded",
            Self::StepTolerance => {
                "Largest parameter displacement of the last iteration is below the step tolerance"
            }
            Self::ValueTolerance => {
                "Cost function values at the start and end of the last iteration are within the value tolerance"
            }
        }
    }

    /// Whether the run stopped on a convergence criterion
    pub fn converged(&self) -> bool {
        !matches!(self, Self::MaximumIterations)
    }
}

impl std::fmt::Display for StopCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of an optimization run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    /// Best parameters found
    pub position: Vec<f64>,
    /// Cost at `position`
    pub value: f64,
    /// Cost at the initial position
    pub initial_value: f64,
    /// Completed iterations
    pub iterations: usize,
    /// Cost function evaluations
    pub evaluations: usize,
    /// Why the run stopped
    pub stop_condition: StopCondition,
}

/// Progress report passed to observers after every iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// 1-based iteration number
    pub iteration: usize,
    /// Best cost so far
    pub value: f64,
    /// Largest parameter displacement during the iteration
    pub step: f64,
    /// Cost function evaluations so far
    pub evaluations: usize,
}

/// Derivative-free Powell optimizer
#[derive(Debug, Clone)]
pub struct PowellOptimizer {
    config: PowellConfig,
}

impl PowellOptimizer {
    /// Create an optimizer with validated settings
    pub fn new(config: PowellConfig) -> OptimResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Optimizer settings
    pub fn config(&self) -> &PowellConfig {
        &self.config
    }

    /// Minimize `cost` starting from `initial`
    ///
    /// Blocks until a stop condition is met. Reaching the iteration cap is
    /// a normal termination, reported through
    /// [`OptimizationResult::stop_condition`].
    ///
    /// # Errors
    ///
    /// Fails if `initial` has the wrong length, the cost function has no
    /// parameters, or an evaluation fails.
    pub fn optimize<C: CostFunction>(
        &self,
        cost: &mut C,
        initial: &[f64],
    ) -> OptimResult<OptimizationResult> {
        self.optimize_with_observer(cost, initial, |_| {})
    }

    /// Like [`optimize`](Self::optimize), calling `observer` after every
    /// iteration
    pub fn optimize_with_observer<C: CostFunction>(
        &self,
        cost: &mut C,
        initial: &[f64],
        mut observer: impl FnMut(&IterationReport),
    ) -> OptimResult<OptimizationResult> {
        let n = cost.number_of_parameters();
        if n == 0 {
            return Err(OptimError::NoParameters);
        }
        if initial.len() != n {
            return Err(OptimError::PositionLength {
                expected: n,
                actual: initial.len(),
            });
        }

        let mut evaluations = 0usize;
        let mut p = initial.to_vec();
        let mut fx = evaluate(cost, &p, &mut evaluations)?;
        let initial_value = fx;

        let mut directions: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let mut d = vec![0.0; n];
                d[i] = 1.0;
                d
            })
            .collect();
        let mut pt = p.clone();

        let mut iterations = 0;
        let mut stop_condition = StopCondition::MaximumIterations;

        while iterations < self.config.max_iterations {
            iterations += 1;
            let fp = fx;
            let mut ibig = 0;
            let mut del = 0.0;

            for (i, dir) in directions.iter().enumerate() {
                let before = fx;
                fx = self.minimize_along(cost, &mut p, dir, fx, &mut evaluations)?;
                if before - fx > del {
                    del = before - fx;
                    ibig = i;
                }
            }

            let step = p
                .iter()
                .zip(&pt)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            tracing::debug!(iteration = iterations, value = fx, step, "powell iteration");
            observer(&IterationReport {
                iteration: iterations,
                value: fx,
                step,
                evaluations,
            });

            if 2.0 * (fp - fx).abs() <= self.config.value_tolerance * (fp.abs() + fx.abs()) + 1e-20 {
                stop_condition = StopCondition::ValueTolerance;
                break;
            }
            if step < self.config.step_tolerance {
                stop_condition = StopCondition::StepTolerance;
                break;
            }

            // Extrapolate along the average direction of this iteration
            let ptt: Vec<f64> = p.iter().zip(&pt).map(|(a, b)| 2.0 * a - b).collect();
            let xit: Vec<f64> = p.iter().zip(&pt).map(|(a, b)| a - b).collect();
            pt.clone_from(&p);
            let fptt = evaluate(cost, &ptt, &mut evaluations)?;
            if fptt < fp {
                let t = 2.0 * (fp - 2.0 * fx + fptt) * (fp - fx - del).powi(2)
                    - del * (fp - fptt).powi(2);
                if t < 0.0 {
                    fx = self.minimize_along(cost, &mut p, &xit, fx, &mut evaluations)?;
                    directions[ibig] = directions[n - 1].clone();
                    directions[n - 1] = xit;
                }
            }
        }

        if stop_condition == StopCondition::MaximumIterations {
            tracing::warn!(
                iterations,
                value = fx,
                "optimizer stopped at the iteration cap without converging"
            );
        }

        Ok(OptimizationResult {
            position: p,
            value: fx,
            initial_value,
            iterations,
            evaluations,
            stop_condition,
        })
    }

    /// Line-minimize from `p` along `dir`, moving `p` to the minimum found
    fn minimize_along<C: CostFunction>(
        &self,
        cost: &mut C,
        p: &mut [f64],
        dir: &[f64],
        fp: f64,
        evaluations: &mut usize,
    ) -> OptimResult<f64> {
        let mut trial = vec![0.0; p.len()];
        let (alpha, value) = {
            let origin: &[f64] = p;
            let mut along = |alpha: f64| -> OptimResult<f64> {
                for ((t, &x), &d) in trial.iter_mut().zip(origin).zip(dir) {
                    *t = x + alpha * d;
                }
                evaluate(&mut *cost, &trial, &mut *evaluations)
            };
            line_minimize(
                &mut along,
                fp,
                self.config.step_length,
                self.config.step_tolerance,
                self.config.max_line_iterations,
            )?
        };
        for (x, &d) in p.iter_mut().zip(dir) {
            *x += alpha * d;
        }
        Ok(value)
    }
}

fn evaluate<C: CostFunction>(cost: &mut C, p: &[f64], evaluations: &mut usize) -> OptimResult<f64> {
    *evaluations += 1;
    cost.value(p).map_err(|e| OptimError::Cost(Box::new(e)))
}
