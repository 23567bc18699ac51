//! Typed derivative chain and the parameter flatten/scatter cycle.
//!
//! Backpropagation composes four derivative factors in exactly one order:
//! cost with respect to the output, output with respect to the layer
//! output, layer output with respect to the pre-activation, and
//! pre-activation with respect to the weights or the layer input. Each
//! stage gets its own wrapper type whose only operations chain to the next
//! stage, so composing out of order is a compile error rather than a shape
//! accident at run time.
//!
//! The chain, for one training step of one layer:
//!
//! ```text
//! OutputCostDerivative ─chain(OutputDerivative)→ LayerCostDerivative
//! LayerCostDerivative ─chain(ActivationDerivative)→ Erroneousness
//! Erroneousness ─chain_weights(WeightApplyDerivative)→ ParameterError
//! Erroneousness ─chain_input(InputApplyDerivative)→ LayerInputError
//! LayerInputError ─chain(LayerInputDerivative)→ LayerCostDerivative   (previous layer)
//! ```
//!
//! All of these are created and consumed within a single step; none carry
//! state of their own.
//!
//! [`UnrolledParameters`] and [`UnrolledParameterErrors`] flatten every
//! layer's matrix into one contiguous column vector for the optimizer,
//! recording per-matrix offsets so the updated values can be scattered
//! back. The scatter is the only point in the engine where weights are
//! mutated.

use crate::tensors::Tensor;
use crate::values::{BiasLackingLayerWeights, LayerWeights};

/// ∂cost/∂output: the derivative of the cost with respect to the network's
/// final output values.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputCostDerivative {
    values: Tensor,
}

impl OutputCostDerivative {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    /// Chains through the output set's Jacobian toward its layer output.
    pub fn chain(self, with: &OutputDerivative) -> LayerCostDerivative {
        LayerCostDerivative {
            values: self.values.mul(&with.values),
        }
    }

    /// Skips the chain step for output sets with a unit Jacobian.
    pub fn into_layer_cost_derivative(self) -> LayerCostDerivative {
        LayerCostDerivative {
            values: self.values,
        }
    }
}

/// Jacobian of an output set with respect to the layer output it wraps.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDerivative {
    values: Tensor,
}

impl OutputDerivative {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }
}

/// ∂cost/∂(layer output): the derivative with respect to a layer's
/// activated output.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCostDerivative {
    values: Tensor,
}

impl LayerCostDerivative {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    /// Chains through the activation function's elementwise derivative.
    pub fn chain(self, with: &ActivationDerivative) -> Erroneousness {
        Erroneousness {
            values: self.values.mul(&with.values),
        }
    }

    /// Skips the activation chain step where the derivative is exactly one.
    pub fn into_erroneousness(self) -> Erroneousness {
        Erroneousness {
            values: self.values,
        }
    }
}

/// Elementwise derivative of an activation function, same shape as the
/// layer output.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationDerivative {
    values: Tensor,
}

impl ActivationDerivative {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }
}

/// ∂cost/∂(pre-activation): the quantity propagated backward between
/// layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Erroneousness {
    values: Tensor,
}

impl Erroneousness {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    /// Chains through the apply function's weight derivative, producing
    /// this layer's weight gradient: `inputᵀ × erroneousness`.
    pub fn chain_weights(&self, with: WeightApplyDerivative<'_>) -> ParameterError {
        ParameterError {
            values: with.values.transpose().matmul(&self.values),
        }
    }

    /// Chains through the apply function's input derivative, producing the
    /// error at the layer's (bias-augmented) input:
    /// `erroneousness × weightsᵀ`.
    pub fn chain_input(&self, with: InputApplyDerivative<'_>) -> LayerInputError {
        LayerInputError {
            values: self.values.matmul(&with.values.transpose()),
        }
    }
}

/// ∂output/∂weights of a parameter-apply function; for dense matmul this
/// borrows the layer input itself.
#[derive(Debug, Clone, Copy)]
pub struct WeightApplyDerivative<'a> {
    values: &'a Tensor,
}

impl<'a> WeightApplyDerivative<'a> {
    pub fn new(values: &'a Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        self.values
    }
}

/// ∂output/∂input of a parameter-apply function; for dense matmul this
/// borrows the weight matrix itself.
#[derive(Debug, Clone, Copy)]
pub struct InputApplyDerivative<'a> {
    values: &'a Tensor,
}

impl<'a> InputApplyDerivative<'a> {
    pub fn new(values: &'a Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        self.values
    }
}

/// ∂cost/∂(layer input), still carrying the bias column.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInputError {
    values: Tensor,
}

impl LayerInputError {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    /// Chains through the layer input's Jacobian toward the set it wraps,
    /// dropping the bias column on the way.
    pub fn chain(self, with: &LayerInputDerivative) -> LayerCostDerivative {
        LayerCostDerivative {
            values: self.values.without_first_column().mul(&with.values),
        }
    }
}

/// Jacobian of a bias-augmented layer input with respect to the wrapped
/// set (the bias column excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInputDerivative {
    values: Tensor,
}

impl LayerInputDerivative {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }
}

/// ∂cost/∂weights for one layer, shaped like that layer's weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterError {
    values: Tensor,
}

impl ParameterError {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    offset: usize,
    rows: usize,
    cols: usize,
}

fn unroll_matrices<'a>(matrices: impl Iterator<Item = &'a Tensor>) -> (Vec<f64>, Vec<Segment>) {
    let mut data = Vec::new();
    let mut segments = Vec::new();
    for m in matrices {
        segments.push(Segment {
            offset: data.len(),
            rows: m.rows(),
            cols: m.cols(),
        });
        data.extend_from_slice(m.data());
    }
    (data, segments)
}

/// Every layer's weight matrix flattened row-major and stacked into one
/// column vector, with recorded offsets for scattering updates back.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrolledParameters {
    data: Vec<f64>,
    segments: Vec<Segment>,
}

impl UnrolledParameters {
    /// Flattens the given weight matrices, preserving their order.
    ///
    /// # Panics
    /// Panics if `weights` is empty.
    pub fn unroll(weights: &[LayerWeights]) -> Self {
        assert!(!weights.is_empty(), "nothing to unroll");
        let (data, segments) = unroll_matrices(weights.iter().map(|w| w.values()));
        Self { data, segments }
    }

    /// Total number of parameters across all layers.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Mutable view for the optimizer's in-place update.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Scatters the (updated) flat vector back into the original weight
    /// matrices by the recorded offsets.
    ///
    /// # Panics
    /// Panics if `weights` does not match the matrices this was unrolled
    /// from, layer by layer.
    pub fn scatter_into(&self, weights: &mut [LayerWeights]) {
        assert_eq!(self.segments.len(), weights.len(), "layer count mismatch");
        for (segment, target) in self.segments.iter().zip(weights.iter_mut()) {
            let values = target.values_mut();
            assert_eq!(
                (segment.rows, segment.cols),
                (values.rows(), values.cols()),
                "weight shape changed between unroll and scatter"
            );
            let slice = &self.data[segment.offset..segment.offset + segment.rows * segment.cols];
            values.data_mut().copy_from_slice(slice);
        }
    }
}

/// Every layer's weight gradient flattened and stacked, mirroring
/// [`UnrolledParameters`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnrolledParameterErrors {
    data: Vec<f64>,
}

impl UnrolledParameterErrors {
    /// # Panics
    /// Panics if `errors` is empty.
    pub fn unroll(errors: &[ParameterError]) -> Self {
        assert!(!errors.is_empty(), "nothing to unroll");
        let (data, _) = unroll_matrices(errors.iter().map(|e| e.values()));
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }
}

/// Bias-lacking weight matrices flattened for cost functions that support
/// weight decay. No implemented cost function reads them yet; they are
/// threaded through so a decay-carrying variant would not change any call
/// site.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightDecayParameters {
    data: Vec<f64>,
}

impl WeightDecayParameters {
    pub fn unroll(weights: &[BiasLackingLayerWeights]) -> Self {
        let (data, _) = unroll_matrices(weights.iter().map(|w| w.values()));
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }
}
