//! Multi-layer feed-forward network orchestration.
//!
//! The network composes the strategy functions across an arbitrary layer
//! stack. The forward pass records every layer's (bias-augmented input,
//! pre-activation, activated output) triple; the backward pass walks the
//! layers in reverse, chaining each layer's erroneousness through the
//! apply function's input derivative, the bias trim, and the activation
//! derivative to reach the layer below. Weight gradients are flattened,
//! handed to the optimizer, and scattered back in one place.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::{DataSet, SupervisedInOutSet};
use crate::derivatives::{
    Erroneousness, ParameterError, UnrolledParameterErrors, UnrolledParameters,
    WeightDecayParameters,
};
use crate::error::{Error, Result};
use crate::functions::activation::ActivationFunction;
use crate::functions::apply::{MatrixMultiply, ParameterApply};
use crate::functions::cost::CostFunction;
use crate::functions::optimize::{OptimizationFunction, OptimizerState};
use crate::learner::SupervisedLearner;
use crate::values::{
    CostSet, InputSet, LayerInputSet, LayerOutputSet, LayerWeights, OutputSet,
    UnactivatedLayerOutputSet,
};

/// Cost function used when none is chosen explicitly.
pub const DEFAULT_COST_FUNCTION: CostFunction = CostFunction::HalfSquared;

/// Activation function used when none is chosen explicitly.
pub const DEFAULT_ACTIVATION_FUNCTION: ActivationFunction = ActivationFunction::Sigmoid;

/// Perturbation used by [`NeuralNetwork::check_derivatives`].
const GRADIENT_CHECK_EPSILON: f64 = 1e-4;

/// The deep-clonable state of a network experiment: per-layer weights,
/// optional optimizer state, and the completed-step counter.
#[derive(Debug, Clone)]
pub struct NetworkState {
    layer_weights: Vec<LayerWeights>,
    optimization_state: Option<OptimizerState>,
    iterations: u64,
}

impl NetworkState {
    /// Samples fresh standard-normal weights for the given layer sizes
    /// (input size first, output size last).
    ///
    /// # Panics
    /// Panics if fewer than two sizes are given.
    pub fn randomized(layer_sizes: &[usize], rng: &mut impl Rng) -> Self {
        assert!(layer_sizes.len() >= 2, "need at least input and output sizes");
        let layer_weights = layer_sizes
            .windows(2)
            .map(|pair| LayerWeights::randomized(pair[0], pair[1], rng))
            .collect();
        Self {
            layer_weights,
            optimization_state: None,
            iterations: 0,
        }
    }

    /// Rebuilds a state from restored weights, validating that consecutive
    /// layers fit together.
    pub fn restored(layer_weights: Vec<LayerWeights>, iterations: u64) -> Result<Self> {
        if layer_weights.is_empty() {
            return Err(Error::InvalidData("a network needs at least one layer".into()));
        }
        for (i, pair) in layer_weights.windows(2).enumerate() {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(Error::InvalidShape(format!(
                    "layer {i} produces {} outputs but layer {} expects {} inputs",
                    pair[0].output_size(),
                    i + 1,
                    pair[1].input_size()
                )));
            }
        }
        Ok(Self {
            layer_weights,
            optimization_state: None,
            iterations,
        })
    }

    pub fn weights(&self) -> &[LayerWeights] {
        &self.layer_weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut [LayerWeights] {
        &mut self.layer_weights
    }

    /// # Panics
    /// Panics if `layer` is out of range.
    pub fn layer_weights(&self, layer: usize) -> &LayerWeights {
        &self.layer_weights[layer]
    }

    pub fn layer_count(&self) -> usize {
        self.layer_weights.len()
    }

    pub fn iteration_count(&self) -> u64 {
        self.iterations
    }

    pub fn optimization_state(&self) -> Option<&OptimizerState> {
        self.optimization_state.as_ref()
    }

    pub(crate) fn complete_step(&mut self) {
        self.iterations += 1;
    }
}

/// One layer's recorded forward computation.
#[derive(Debug, Clone)]
pub struct LayerResult {
    layer_input: LayerInputSet,
    unactivated: UnactivatedLayerOutputSet,
    activated: LayerOutputSet,
}

impl LayerResult {
    pub fn layer_input(&self) -> &LayerInputSet {
        &self.layer_input
    }

    pub fn unactivated(&self) -> &UnactivatedLayerOutputSet {
        &self.unactivated
    }

    pub fn activated(&self) -> &LayerOutputSet {
        &self.activated
    }
}

/// A full forward pass: every layer's triple plus the wrapped final output.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    layers: Vec<LayerResult>,
    output: OutputSet,
}

impl ProcessResult {
    pub fn output(&self) -> &OutputSet {
        &self.output
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// # Panics
    /// Panics if `layer` is out of range.
    pub fn layer(&self, layer: usize) -> &LayerResult {
        &self.layers[layer]
    }

    pub fn final_layer(&self) -> &LayerResult {
        &self.layers[self.layers.len() - 1]
    }

    pub fn layer_input(&self, layer: usize) -> &LayerInputSet {
        self.layer(layer).layer_input()
    }

    pub fn unactivated(&self, layer: usize) -> &UnactivatedLayerOutputSet {
        self.layer(layer).unactivated()
    }

    pub fn activated(&self, layer: usize) -> &LayerOutputSet {
        self.layer(layer).activated()
    }
}

/// A feed-forward network trained by backpropagation.
///
/// Construction takes an explicit seed; the experiment state exists from
/// that moment, so inference borrows `&self` and is reproducible.
#[derive(Debug)]
pub struct NeuralNetwork<D: DataSet, A: ParameterApply = MatrixMultiply> {
    cost_function: CostFunction,
    activation_function: ActivationFunction,
    optimization_function: OptimizationFunction,
    apply_function: A,
    data_set: D,
    layer_sizes: Vec<usize>,
    state: NetworkState,
    rng: StdRng,
    seed: u64,
}

impl<D: DataSet> NeuralNetwork<D, MatrixMultiply> {
    /// A network with the default cost and activation, trained by gradient
    /// descent at `learning_rate`.
    pub fn new(
        data_set: D,
        learning_rate: f64,
        hidden_layer_sizes: &[usize],
        seed: u64,
    ) -> Result<Self> {
        Self::with_functions(
            DEFAULT_COST_FUNCTION,
            DEFAULT_ACTIVATION_FUNCTION,
            OptimizationFunction::gradient_descent(learning_rate),
            data_set,
            hidden_layer_sizes,
            seed,
        )
    }

    pub fn with_cost(
        cost_function: CostFunction,
        data_set: D,
        learning_rate: f64,
        hidden_layer_sizes: &[usize],
        seed: u64,
    ) -> Result<Self> {
        Self::with_functions(
            cost_function,
            DEFAULT_ACTIVATION_FUNCTION,
            OptimizationFunction::gradient_descent(learning_rate),
            data_set,
            hidden_layer_sizes,
            seed,
        )
    }

    pub fn with_activation(
        activation_function: ActivationFunction,
        data_set: D,
        learning_rate: f64,
        hidden_layer_sizes: &[usize],
        seed: u64,
    ) -> Result<Self> {
        Self::with_functions(
            DEFAULT_COST_FUNCTION,
            activation_function,
            OptimizationFunction::gradient_descent(learning_rate),
            data_set,
            hidden_layer_sizes,
            seed,
        )
    }

    pub fn with_functions(
        cost_function: CostFunction,
        activation_function: ActivationFunction,
        optimization_function: OptimizationFunction,
        data_set: D,
        hidden_layer_sizes: &[usize],
        seed: u64,
    ) -> Result<Self> {
        Self::with_strategies(
            cost_function,
            activation_function,
            optimization_function,
            MatrixMultiply,
            data_set,
            hidden_layer_sizes,
            seed,
        )
    }
}

impl<D: DataSet, A: ParameterApply> NeuralNetwork<D, A> {
    /// The fully general constructor: every strategy chosen explicitly.
    pub fn with_strategies(
        cost_function: CostFunction,
        activation_function: ActivationFunction,
        optimization_function: OptimizationFunction,
        apply_function: A,
        data_set: D,
        hidden_layer_sizes: &[usize],
        seed: u64,
    ) -> Result<Self> {
        optimization_function.validate()?;
        if data_set.input_size() == 0 || data_set.output_size() == 0 {
            return Err(Error::InvalidConfig(
                "dataset must have at least one input and one output feature".into(),
            ));
        }
        if let Some(bad) = hidden_layer_sizes.iter().find(|&&s| s == 0) {
            return Err(Error::InvalidConfig(format!(
                "hidden layer sizes must be positive, got {bad}"
            )));
        }

        let mut layer_sizes = Vec::with_capacity(hidden_layer_sizes.len() + 2);
        layer_sizes.push(data_set.input_size());
        layer_sizes.extend_from_slice(hidden_layer_sizes);
        layer_sizes.push(data_set.output_size());

        let mut rng = StdRng::seed_from_u64(seed);
        let state = NetworkState::randomized(&layer_sizes, &mut rng);

        Ok(Self {
            cost_function,
            activation_function,
            optimization_function,
            apply_function,
            data_set,
            layer_sizes,
            state,
            rng,
            seed,
        })
    }

    pub fn activation_function(&self) -> ActivationFunction {
        self.activation_function
    }

    pub fn optimization_function(&self) -> &OptimizationFunction {
        &self.optimization_function
    }

    pub fn apply_function(&self) -> &A {
        &self.apply_function
    }

    pub fn weights(&self) -> &[LayerWeights] {
        self.state.weights()
    }

    /// # Panics
    /// Panics if `layer` is out of range.
    pub fn layer_weights(&self, layer: usize) -> &LayerWeights {
        self.state.layer_weights(layer)
    }

    pub fn layer_count(&self) -> usize {
        self.state.layer_count()
    }

    pub fn input_size(&self) -> usize {
        self.layer_sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Re-derives the initial state (and batch sampler) from the seed.
    pub fn restore_default_state(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.state = NetworkState::randomized(&self.layer_sizes, &mut self.rng);
    }

    /// Discards the experiment and starts over from a new seed.
    pub fn recreate_state(&mut self, seed: u64) {
        self.seed = seed;
        self.restore_default_state();
    }

    /// Bias-stripped copies of all weight matrices, for regularizing cost
    /// functions.
    pub fn weight_decay_parameters(&self) -> WeightDecayParameters {
        let stripped: Vec<_> = self.state.weights().iter().map(|w| w.without_bias()).collect();
        WeightDecayParameters::unroll(&stripped)
    }

    fn process_layer(&self, layer_input: LayerInputSet, layer: usize) -> LayerResult {
        let unactivated = self
            .apply_function
            .output(&layer_input, self.state.layer_weights(layer));
        let activated = self.activation_function.apply(&unactivated);
        LayerResult {
            layer_input,
            unactivated,
            activated,
        }
    }

    /// Runs the forward pass, recording every layer's intermediate
    /// results.
    pub fn process_full_output(&self, input: &InputSet) -> Result<ProcessResult> {
        if input.input_count() != self.input_size() {
            return Err(Error::InvalidShape(format!(
                "input has {} features but the network expects {}",
                input.input_count(),
                self.input_size()
            )));
        }

        let mut layers = Vec::with_capacity(self.layer_count());
        let mut layer_input = LayerInputSet::from_input(input);
        for layer in 0..self.layer_count() {
            let result = self.process_layer(layer_input, layer);
            layer_input = LayerInputSet::from_layer_output(result.activated());
            layers.push(result);
        }

        let output = OutputSet::from_layer_output(layers[layers.len() - 1].activated());
        Ok(ProcessResult { layers, output })
    }

    /// Analytic per-layer weight gradients for one batch. Read-only on the
    /// weights; [`train_batch`](SupervisedLearner::train_batch) applies
    /// them.
    pub fn weight_gradients(&self, batch: &SupervisedInOutSet) -> Result<Vec<ParameterError>> {
        self.check_output_size(batch)?;
        let result = self.process_full_output(batch.input_set())?;
        let decay = self.weight_decay_parameters();
        let layer_count = self.layer_count();

        // erroneousness per layer, built from the output end backwards
        let mut errors: Vec<Erroneousness> = Vec::with_capacity(layer_count);
        let final_layer = result.final_layer();
        errors.push(self.cost_function.erroneousness(
            &decay,
            batch.output_set(),
            result.output(),
            final_layer.unactivated(),
            final_layer.activated(),
            self.activation_function,
        ));
        for layer in (0..layer_count.saturating_sub(1)).rev() {
            let above = &errors[errors.len() - 1];
            let layer_input = result.layer_input(layer + 1);
            let input_error = above.chain_input(
                self.apply_function
                    .input_derivative(layer_input, self.state.layer_weights(layer + 1)),
            );
            let layer_derivative = input_error.chain(&layer_input.layer_input_derivative());
            errors.push(layer_derivative.chain(&self.activation_function.derivative(
                result.unactivated(layer),
                result.activated(layer),
            )));
        }
        errors.reverse();

        Ok(errors
            .iter()
            .enumerate()
            .map(|(layer, erroneousness)| {
                erroneousness.chain_weights(self.apply_function.weight_derivative(
                    result.layer_input(layer),
                    self.state.layer_weights(layer),
                ))
            })
            .collect())
    }

    fn train_on(&mut self, batch: &SupervisedInOutSet) -> Result<()> {
        let gradients = self.weight_gradients(batch)?;

        let mut parameters = UnrolledParameters::unroll(self.state.weights());
        let errors = UnrolledParameterErrors::unroll(&gradients);
        self.state.optimization_state = self.optimization_function.step(
            self.state.optimization_state.take(),
            &mut parameters,
            &errors,
        );
        parameters.scatter_into(self.state.weights_mut());
        Ok(())
    }

    fn check_output_size(&self, set: &SupervisedInOutSet) -> Result<()> {
        if set.output_size() != self.output_size() {
            return Err(Error::InvalidShape(format!(
                "output has {} labels but the network produces {}",
                set.output_size(),
                self.output_size()
            )));
        }
        Ok(())
    }

    fn batch_cost(&self, function: Option<CostFunction>, set: &SupervisedInOutSet) -> Result<CostSet> {
        self.check_output_size(set)?;
        let actual = self.process_full_output(set.input_set())?;
        Ok(function.unwrap_or(self.cost_function).cost(
            &self.weight_decay_parameters(),
            set.output_set(),
            actual.output(),
        ))
    }

    /// Numerically estimates the weight gradient of one layer over `set`
    /// by central differences and returns it for comparison against
    /// [`weight_gradients`](Self::weight_gradients).
    ///
    /// Each weight cell is perturbed by ±1e-4 with the full state restored
    /// between perturbations; the live state is untouched afterwards.
    pub fn check_derivatives(
        &mut self,
        set: &SupervisedInOutSet,
        layer: usize,
    ) -> Result<ParameterError> {
        if layer >= self.layer_count() {
            return Err(Error::InvalidConfig(format!(
                "layer {layer} is out of range for a {}-layer network",
                self.layer_count()
            )));
        }

        let initial = self.state.clone();
        let rows = initial.layer_weights(layer).values().rows();
        let cols = initial.layer_weights(layer).values().cols();
        let mut estimate = crate::tensors::Tensor::zeros(rows, cols);

        for row in 0..rows {
            for col in 0..cols {
                let mut difference = 0.0;
                for direction in [-1.0, 1.0] {
                    self.state = initial.clone();
                    let weights = &mut self.state.weights_mut()[layer];
                    let nudged = weights.values().get(row, col) + direction * GRADIENT_CHECK_EPSILON;
                    weights.values_mut().set(row, col, nudged);
                    match self.batch_cost(None, set) {
                        Ok(cost) => difference += direction * cost.sum(),
                        Err(err) => {
                            self.state = initial;
                            return Err(err);
                        }
                    }
                }
                estimate.set(row, col, difference / (2.0 * GRADIENT_CHECK_EPSILON));
            }
        }

        self.state = initial;
        Ok(ParameterError::new(estimate))
    }
}

impl<D: DataSet, A: ParameterApply> SupervisedLearner for NeuralNetwork<D, A> {
    type State = NetworkState;

    fn cost_function(&self) -> CostFunction {
        self.cost_function
    }

    fn data_set(&self) -> &dyn DataSet {
        &self.data_set
    }

    fn process(&self, input: &InputSet) -> Result<OutputSet> {
        Ok(self.process_full_output(input)?.output().clone())
    }

    fn cost(&self, function: Option<CostFunction>, set: &SupervisedInOutSet) -> Result<CostSet> {
        self.batch_cost(function, set)
    }

    fn train_batch(&mut self, batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".into()));
        }
        let batch = self
            .data_set
            .training_set()
            .inner()
            .randomized_batch(batch_size, &mut self.rng)?;
        self.train_on(&batch)?;
        self.state.complete_step();
        Ok(())
    }

    fn state(&self) -> &NetworkState {
        &self.state
    }

    fn restore_state(&mut self, state: NetworkState) {
        self.state = state;
    }

    fn iteration_count(&self) -> u64 {
        self.state.iteration_count()
    }
}
