//! Activation functions and their elementwise derivatives.

use crate::derivatives::ActivationDerivative;
use crate::values::{LayerOutputSet, UnactivatedLayerOutputSet};

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// An elementwise nonlinearity applied to a layer's pre-activation output.
///
/// The derivative is computed from whichever of the pre- or post-activation
/// tensors is cheaper: sigmoid and relu reuse the already-activated values,
/// softplus reuses the identity softplus′(x) = sigmoid(x) on the
/// unactivated values. None of the variants recompute exponentials they
/// already paid for in the forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFunction {
    /// Passes values through unchanged; derivative is exactly one.
    Identity,
    /// Logistic sigmoid `1 / (1 + e^-x)`.
    Sigmoid,
    /// Rectified linear `max(x, 0)`.
    Relu,
    /// Smooth rectifier `ln(1 + e^x)`.
    Softplus,
}

impl ActivationFunction {
    /// Applies the activation elementwise.
    pub fn apply(&self, unactivated: &UnactivatedLayerOutputSet) -> LayerOutputSet {
        let x = unactivated.values();
        let out = match self {
            Self::Identity => x.clone(),
            Self::Sigmoid => x.map(sigmoid),
            Self::Relu => x.map(|v| if v > 0.0 { v } else { 0.0 }),
            Self::Softplus => x.map(|v| {
                // e^x + 1 overflows past ~709; fall back to the raw input
                // before the log so the result stays finite
                let n = v.exp() + 1.0;
                if n.is_infinite() { v.ln() } else { n.ln() }
            }),
        };
        LayerOutputSet::new(out)
    }

    /// Elementwise derivative, same shape as the layer output.
    pub fn derivative(
        &self,
        unactivated: &UnactivatedLayerOutputSet,
        activated: &LayerOutputSet,
    ) -> ActivationDerivative {
        let values = match self {
            Self::Identity => unactivated.values().map(|_| 1.0),
            // σ′(x) = σ(x)·(1 − σ(x)), taken from the activated values
            Self::Sigmoid => activated.values().map(|a| a * (1.0 - a)),
            // sign of the activated value: 0 at and below the kink
            Self::Relu => activated.values().map(|a| if a > 0.0 { 1.0 } else { 0.0 }),
            // softplus′(x) = σ(x) on the unactivated values
            Self::Softplus => unactivated.values().map(sigmoid),
        };
        ActivationDerivative::new(values)
    }

    /// Whether the derivative is exactly one everywhere, letting the chain
    /// skip the multiply.
    pub fn has_unit_derivative(&self) -> bool {
        matches!(self, Self::Identity)
    }
}
