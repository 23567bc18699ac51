//! Optimizers consuming flattened parameters and gradients.

use crate::derivatives::{UnrolledParameters, UnrolledParameterErrors};
use crate::error::{Error, Result};

/// Updates the flattened parameter vector from the flattened gradient
/// vector, mutating the parameters in place.
///
/// Stateful variants thread their state through [`step`](Self::step):
/// whatever state a step returns is handed back on the next one.
/// Gradient descent carries none and returns `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizationFunction {
    /// Plain gradient descent: `params -= learning_rate × gradients`.
    GradientDescent { learning_rate: f64 },
}

/// Opaque state owned by a stateful optimizer between steps.
///
/// No implemented variant constructs one yet; the type exists so momentum
/// or adaptive-rate optimizers can be added without changing the state
/// plumbing, and so checkpoints deep-clone whatever state appears.
#[derive(Debug, Clone)]
pub enum OptimizerState {}

impl OptimizationFunction {
    pub fn gradient_descent(learning_rate: f64) -> Self {
        Self::GradientDescent { learning_rate }
    }

    /// Validates hyperparameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::GradientDescent { learning_rate } => {
                if !(learning_rate.is_finite() && learning_rate > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "learning rate must be finite and > 0, got {learning_rate}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Applies one update step in place and returns the state to carry
    /// into the next step.
    ///
    /// # Panics
    /// Panics if the parameter and gradient vectors differ in length.
    pub fn step(
        &self,
        state: Option<OptimizerState>,
        parameters: &mut UnrolledParameters,
        errors: &UnrolledParameterErrors,
    ) -> Option<OptimizerState> {
        assert_eq!(
            parameters.len(),
            errors.len(),
            "gradient vector length does not match parameter vector length"
        );
        match *self {
            Self::GradientDescent { learning_rate } => {
                for (param, grad) in parameters.values_mut().iter_mut().zip(errors.values()) {
                    *param -= learning_rate * grad;
                }
                // stateless; drop whatever was threaded in
                let _ = state;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_descent_rejects_bad_learning_rates() {
        assert!(OptimizationFunction::gradient_descent(0.0).validate().is_err());
        assert!(OptimizationFunction::gradient_descent(-0.5).validate().is_err());
        assert!(
            OptimizationFunction::gradient_descent(f64::NAN)
                .validate()
                .is_err()
        );
        assert!(OptimizationFunction::gradient_descent(0.1).validate().is_ok());
    }
}
