//! Single-valued cost function interface

/// Objective minimized by the optimizers in this crate
///
/// The cost function owns whatever state the parameters drive; `value`
/// takes `&mut self` so an implementation can write the parameters into
/// that state before evaluating.
pub trait CostFunction {
    /// Error returned by evaluations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Number of parameters the function expects
    fn number_of_parameters(&self) -> usize;

    /// Value of the objective at `parameters`
    fn value(&mut self, parameters: &[f64]) -> Result<f64, Self::Error>;

    /// Gradient of the objective at `parameters`
    fn derivative(&mut self, parameters: &[f64]) -> Result<Vec<f64>, Self::Error>;

    /// Value and gradient at `parameters`
    fn value_and_derivative(&mut self, parameters: &[f64]) -> Result<(f64, Vec<f64>), Self::Error> {
        let value = self.value(parameters)?;
        let derivative = self.derivative(parameters)?;
        Ok((value, derivative))
    }

    /// Whether each parameter only affects a local part of the domain
    fn has_local_support(&self) -> bool {
        false
    }
}
