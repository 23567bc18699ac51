//! Cost functions, their output derivatives, and the erroneousness
//! composite that seeds the backward pass.

use crate::derivatives::{
    Erroneousness, OutputCostDerivative, ParameterError, WeightDecayParameters,
};
use crate::functions::activation::ActivationFunction;
use crate::functions::apply::ParameterApply;
use crate::tensors::Tensor;
use crate::values::{
    CostSet, LayerInputSet, LayerOutputSet, LayerWeights, OutputSet, UnactivatedLayerOutputSet,
};

/// Elementwise natural log with infinities clamped to the most negative
/// finite value, so that log(0) terms stay finite in the cost.
fn zlog(t: &Tensor) -> Tensor {
    t.map(|x| {
        let l = x.ln();
        if l.is_infinite() { -f64::MAX } else { l }
    })
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Scores how far actual outputs landed from expected ones, and
/// differentiates that score for training.
///
/// All variants reduce over the example dimension by the mean, so
/// gradients are comparable across batch sizes. The `weight_decay`
/// parameter is accepted by every operation for regularizing variants;
/// none of the current ones read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostFunction {
    /// Half squared error: `mean((expected − actual)²) / 2` per column.
    HalfSquared,
    /// Mean absolute error per column.
    Absolute,
    /// Binary cross-entropy per column, masked through the expected set's
    /// mixer.
    Logarithmic,
}

impl CostFunction {
    /// Mean cost per output column.
    pub fn cost(
        &self,
        _weight_decay: &WeightDecayParameters,
        expected: &OutputSet,
        actual: &OutputSet,
    ) -> CostSet {
        let n = expected.set_count() as f64;
        let values = match self {
            Self::HalfSquared => {
                let dif = expected.difference(actual);
                dif.map(|d| d * d).column_sums().scale(1.0 / (2.0 * n))
            }
            Self::Absolute => {
                let dif = expected.difference(actual);
                dif.map(f64::abs).column_sums().scale(1.0 / n)
            }
            Self::Logarithmic => {
                // unlabeled cells take the prediction itself, so their
                // term reduces to the entropy of the prediction and the
                // label drops out
                let y = expected.mix(actual);
                let a = actual.values();
                let one_minus_y = y.map(|v| 1.0 - v);
                let one_minus_a = a.map(|v| 1.0 - v);
                y.mul(&zlog(a))
                    .add(&one_minus_y.mul(&zlog(&one_minus_a)))
                    .column_sums()
                    .scale(-1.0 / n)
            }
        };
        CostSet::new(values)
    }

    /// ∂cost/∂actual, one entry per output cell.
    pub fn output_derivative(
        &self,
        _weight_decay: &WeightDecayParameters,
        expected: &OutputSet,
        actual: &OutputSet,
    ) -> OutputCostDerivative {
        let n = expected.set_count() as f64;
        let dif = expected.difference(actual);
        let values = match self {
            Self::HalfSquared => dif.scale(1.0 / n),
            Self::Absolute => dif.map(sign).scale(1.0 / n),
            Self::Logarithmic => {
                // floor the divisor at the smallest positive normal so a
                // saturated sigmoid cannot blow the quotient up
                let bel = actual
                    .values()
                    .map(|a| (a * (1.0 - a)).max(f64::MIN_POSITIVE));
                dif.zip_map(&bel, |d, b| d / b).scale(1.0 / n)
            }
        };
        OutputCostDerivative::new(values)
    }

    /// ∂cost/∂(pre-activation) of the final layer: the full chain
    /// cost → output → layer output → activation, with the recognized
    /// analytic shortcuts applied.
    ///
    /// Logarithmic cost against a sigmoid layer collapses to the masked
    /// residual over the batch size, because the cost's divisor and the
    /// activation derivative cancel exactly; computing the factors
    /// separately would waste work and invite cancellation error near
    /// saturation. An identity activation similarly skips its multiply.
    pub fn erroneousness(
        &self,
        weight_decay: &WeightDecayParameters,
        expected: &OutputSet,
        actual: &OutputSet,
        unactivated: &UnactivatedLayerOutputSet,
        activated: &LayerOutputSet,
        activation: ActivationFunction,
    ) -> Erroneousness {
        if matches!(self, Self::Logarithmic)
            && actual.has_ignorable_derivative()
            && matches!(activation, ActivationFunction::Sigmoid)
        {
            let n = expected.set_count() as f64;
            return Erroneousness::new(expected.difference(actual).scale(1.0 / n));
        }

        let output_derivative = self.output_derivative(weight_decay, expected, actual);
        let layer_derivative = if actual.has_ignorable_derivative() {
            output_derivative.into_layer_cost_derivative()
        } else {
            output_derivative.chain(&actual.layer_output_derivative())
        };

        if activation.has_unit_derivative() {
            return layer_derivative.into_erroneousness();
        }

        layer_derivative.chain(&activation.derivative(unactivated, activated))
    }

    /// ∂cost/∂weights of a single layer, chaining the erroneousness
    /// through the apply function's weight derivative.
    #[allow(clippy::too_many_arguments)]
    pub fn weight_derivative<A: ParameterApply>(
        &self,
        weight_decay: &WeightDecayParameters,
        expected: &OutputSet,
        actual: &OutputSet,
        layer_input: &LayerInputSet,
        weights: &LayerWeights,
        unactivated: &UnactivatedLayerOutputSet,
        activated: &LayerOutputSet,
        activation: ActivationFunction,
        apply: &A,
    ) -> ParameterError {
        self.erroneousness(weight_decay, expected, actual, unactivated, activated, activation)
            .chain_weights(apply.weight_derivative(layer_input, weights))
    }
}
