//! Parameter application: how a layer's input and weights combine into a
//! pre-activation output.

use crate::derivatives::{InputApplyDerivative, WeightApplyDerivative};
use crate::values::{LayerInputSet, LayerWeights, UnactivatedLayerOutputSet};

/// Combines a bias-augmented layer input with a weight matrix.
///
/// The derivative methods return the operands themselves, wrapped: for a
/// bilinear apply like dense matmul, ∂output/∂weights is the input and
/// ∂output/∂input is the weights, and the caller chains them with the
/// appropriate transposed product. Alternative schemes (sparse,
/// convolutional) can implement this without the chain-rule orchestration
/// changing.
pub trait ParameterApply {
    /// `layer_input × weights`, or this scheme's equivalent.
    fn output(&self, input: &LayerInputSet, weights: &LayerWeights) -> UnactivatedLayerOutputSet;

    /// ∂output/∂weights, to be chained into a weight gradient.
    fn weight_derivative<'a>(
        &self,
        input: &'a LayerInputSet,
        weights: &LayerWeights,
    ) -> WeightApplyDerivative<'a>;

    /// ∂output/∂input, to be chained into a propagated input error.
    fn input_derivative<'a>(
        &self,
        input: &LayerInputSet,
        weights: &'a LayerWeights,
    ) -> InputApplyDerivative<'a>;
}

/// Dense matrix multiplication, the standard fully-connected apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixMultiply;

impl ParameterApply for MatrixMultiply {
    fn output(&self, input: &LayerInputSet, weights: &LayerWeights) -> UnactivatedLayerOutputSet {
        UnactivatedLayerOutputSet::new(input.values().matmul(weights.values()))
    }

    fn weight_derivative<'a>(
        &self,
        input: &'a LayerInputSet,
        _weights: &LayerWeights,
    ) -> WeightApplyDerivative<'a> {
        WeightApplyDerivative::new(input.values())
    }

    fn input_derivative<'a>(
        &self,
        _input: &LayerInputSet,
        weights: &'a LayerWeights,
    ) -> InputApplyDerivative<'a> {
        InputApplyDerivative::new(weights.values())
    }
}
