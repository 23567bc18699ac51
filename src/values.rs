//! Typed wrappers distinguishing the roles a tensor plays in the pipeline.
//!
//! Each wrapper owns exactly one tensor. The types exist so that, for
//! example, a pre-activation matrix cannot be fed where an activated one
//! is expected; they add no behavior beyond the conversions the pipeline
//! actually performs.
//!
//! Data flows `InputSet → LayerInputSet → UnactivatedLayerOutputSet →
//! LayerOutputSet → … → OutputSet`, with [`LayerWeights`] applied at every
//! step and [`CostSet`] summarizing how far the final output landed from
//! the expectation.

use rand::Rng;

use crate::derivatives::{LayerInputDerivative, OutputDerivative};
use crate::error::{Error, Result};
use crate::tensors::Tensor;

/// A batch of input examples: rows are examples, columns are features.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSet {
    values: Tensor,
}

impl InputSet {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    /// Builds an input set from nested rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        Tensor::from_rows(rows)
            .map(Self::new)
            .ok_or_else(|| Error::InvalidData("input rows must be non-empty and rectangular".into()))
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    /// Number of examples in the batch.
    pub fn set_count(&self) -> usize {
        self.values.rows()
    }

    /// Number of features per example.
    pub fn input_count(&self) -> usize {
        self.values.cols()
    }
}

/// A per-cell blend weight in `[0, 1]` paired with an [`OutputSet`].
///
/// A weight of 1 marks a real label; a weight of 0 marks an unlabeled cell
/// whose value should be replaced by the model's own prediction, so its
/// gradient contribution vanishes. Fresh output sets are fully supervised
/// (all ones).
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMixer {
    values: Tensor,
}

impl OutputMixer {
    /// Wraps mixer weights, rejecting values outside `[0, 1]`.
    pub fn new(values: Tensor) -> Result<Self> {
        if values.data().iter().any(|&w| !(0.0..=1.0).contains(&w)) {
            return Err(Error::InvalidData(
                "mixer weights must lie in [0, 1]".into(),
            ));
        }
        Ok(Self { values })
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        Self {
            values: Tensor::ones(rows, cols),
        }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub(crate) fn gather_rows(&self, indices: &[usize]) -> Self {
        Self {
            values: self.values.gather_rows(indices),
        }
    }

    pub(crate) fn slice_rows(&self, from: usize, to: usize) -> Self {
        Self {
            values: self.values.slice_rows(from, to),
        }
    }
}

/// A batch of output labels (or predictions): rows are examples, columns
/// are output features. Carries its [`OutputMixer`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSet {
    values: Tensor,
    mixer: OutputMixer,
}

impl OutputSet {
    pub fn new(values: Tensor) -> Self {
        let mixer = OutputMixer::ones(values.rows(), values.cols());
        Self { values, mixer }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        Tensor::from_rows(rows)
            .map(Self::new)
            .ok_or_else(|| Error::InvalidData("output rows must be non-empty and rectangular".into()))
    }

    pub fn from_layer_output(set: &LayerOutputSet) -> Self {
        Self::new(set.values().clone())
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn set_count(&self) -> usize {
        self.values.rows()
    }

    pub fn output_count(&self) -> usize {
        self.values.cols()
    }

    pub fn mixer(&self) -> &OutputMixer {
        &self.mixer
    }

    /// Replaces the mixer, which must have the same shape as the values.
    pub fn set_mixer(&mut self, mixer: OutputMixer) -> Result<()> {
        if mixer.values().rows() != self.values.rows()
            || mixer.values().cols() != self.values.cols()
        {
            return Err(Error::InvalidShape(format!(
                "mixer shape ({}, {}) does not match output shape ({}, {})",
                mixer.values().rows(),
                mixer.values().cols(),
                self.values.rows(),
                self.values.cols()
            )));
        }
        self.mixer = mixer;
        Ok(())
    }

    /// `actual − self`, masked through both sets' mixers.
    ///
    /// With `self` as the expected labels, this is the raw residual every
    /// cost derivative starts from; masked cells contribute zero.
    pub fn difference(&self, actual: &OutputSet) -> Tensor {
        actual
            .values
            .sub(&self.values)
            .mul(self.mixer.values())
            .mul(actual.mixer.values())
    }

    /// Blends `self` (expected) with `actual` through `self`'s mixer:
    /// cells with weight 0 take the model's own prediction.
    pub fn mix(&self, actual: &OutputSet) -> Tensor {
        let m = self.mixer.values();
        self.values
            .mul(m)
            .add(&actual.values.mul(&m.map(|w| 1.0 - w)))
    }

    /// Unit Jacobian of this set with respect to the layer output it wraps.
    pub fn layer_output_derivative(&self) -> OutputDerivative {
        OutputDerivative::new(Tensor::ones(self.values.rows(), self.values.cols()))
    }

    /// The derivative toward the wrapped layer output is all ones, so
    /// chain steps through it may be skipped.
    pub fn has_ignorable_derivative(&self) -> bool {
        true
    }

    pub(crate) fn gather_rows(&self, indices: &[usize]) -> Self {
        Self {
            values: self.values.gather_rows(indices),
            mixer: self.mixer.gather_rows(indices),
        }
    }

    pub(crate) fn slice_rows(&self, from: usize, to: usize) -> Self {
        Self {
            values: self.values.slice_rows(from, to),
            mixer: self.mixer.slice_rows(from, to),
        }
    }
}

/// A layer's input with the bias trick applied: column 0 is all ones.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInputSet {
    values: Tensor,
}

impl LayerInputSet {
    pub fn from_input(set: &InputSet) -> Self {
        Self {
            values: set.values().with_leading_ones(),
        }
    }

    pub fn from_layer_output(set: &LayerOutputSet) -> Self {
        Self {
            values: set.values().with_leading_ones(),
        }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn set_count(&self) -> usize {
        self.values.rows()
    }

    /// Feature count of the wrapped set, excluding the bias column.
    pub fn input_size(&self) -> usize {
        self.values.cols() - 1
    }

    /// Unit Jacobian toward the wrapped (bias-lacking) set.
    pub fn layer_input_derivative(&self) -> LayerInputDerivative {
        LayerInputDerivative::new(Tensor::ones(self.values.rows(), self.values.cols() - 1))
    }
}

/// A layer's output before the activation function is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct UnactivatedLayerOutputSet {
    values: Tensor,
}

impl UnactivatedLayerOutputSet {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn set_count(&self) -> usize {
        self.values.rows()
    }
}

/// A layer's output after activation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutputSet {
    values: Tensor,
}

impl LayerOutputSet {
    pub fn new(values: Tensor) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn set_count(&self) -> usize {
        self.values.rows()
    }
}

/// Mean cost per output column, as a `1 × outputs` row vector.
#[derive(Debug, Clone, PartialEq)]
pub struct CostSet {
    values: Tensor,
}

impl CostSet {
    pub fn new(values: Tensor) -> Self {
        assert_eq!(values.rows(), 1, "cost set must be a row vector");
        Self { values }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.cols()
    }

    pub fn get(&self, column: usize) -> f64 {
        self.values.get(0, column)
    }

    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    /// Root mean square over the per-column costs.
    pub fn rms(&self) -> f64 {
        let n = self.values.len() as f64;
        (self.values.data().iter().map(|c| c * c).sum::<f64>() / n).sqrt()
    }
}

/// One layer's weight matrix.
///
/// Shape is `(input_size + 1) × output_size`: row 0 holds the bias
/// weights (paired with the ones column of a [`LayerInputSet`]), rows
/// `1..=input_size` hold the ordinary weights.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerWeights {
    values: Tensor,
}

impl LayerWeights {
    /// Samples fresh weights i.i.d. from the standard normal distribution.
    pub fn randomized(input_size: usize, output_size: usize, rng: &mut impl Rng) -> Self {
        Self {
            values: Tensor::randn(input_size + 1, output_size, rng),
        }
    }

    /// Wraps an existing weight matrix; there must be at least a bias row.
    pub fn from_matrix(values: Tensor) -> Result<Self> {
        if values.rows() < 1 || values.cols() < 1 {
            return Err(Error::InvalidShape(
                "weight matrix needs at least one row and one column".into(),
            ));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Tensor {
        &mut self.values
    }

    pub fn input_size(&self) -> usize {
        self.values.rows() - 1
    }

    pub fn output_size(&self) -> usize {
        self.values.cols()
    }

    /// A copy with the bias row removed, for cost functions that
    /// regularize ordinary weights only.
    pub fn without_bias(&self) -> BiasLackingLayerWeights {
        BiasLackingLayerWeights {
            values: self.values.without_first_row(),
        }
    }
}

/// A weight matrix with the bias row stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasLackingLayerWeights {
    values: Tensor,
}

impl BiasLackingLayerWeights {
    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn input_size(&self) -> usize {
        self.values.rows()
    }

    pub fn output_size(&self) -> usize {
        self.values.cols()
    }
}
