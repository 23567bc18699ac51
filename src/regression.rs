//! Linear and logistic regression: the one-layer special case.
//!
//! A regression is the same pipeline as a network with a single weight
//! matrix: one bias-augment, one apply, one activation, and a backward
//! pass that stops after computing that layer's weight gradient. The
//! activation plays the role of the hypothesis function: identity for
//! linear regression, sigmoid for logistic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::{DataSet, SupervisedInOutSet};
use crate::derivatives::{
    ParameterError, UnrolledParameterErrors, UnrolledParameters, WeightDecayParameters,
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

/// The deep-clonable state of a regression experiment.
#[derive(Debug, Clone)]
pub struct RegressionState {
    weights: LayerWeights,
    optimization_state: Option<OptimizerState>,
    iterations: u64,
}

impl RegressionState {
    /// Samples fresh standard-normal weights.
    pub fn randomized(input_size: usize, output_size: usize, rng: &mut impl Rng) -> Self {
        Self {
            weights: LayerWeights::randomized(input_size, output_size, rng),
            optimization_state: None,
            iterations: 0,
        }
    }

    /// Rebuilds a state from restored weights.
    pub fn restored(weights: LayerWeights, iterations: u64) -> Self {
        Self {
            weights,
            optimization_state: None,
            iterations,
        }
    }

    pub fn weights(&self) -> &LayerWeights {
        &self.weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut LayerWeights {
        &mut self.weights
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

/// The single layer's recorded forward computation.
#[derive(Debug, Clone)]
pub struct RegressionProcessResult {
    layer_input: LayerInputSet,
    unactivated: UnactivatedLayerOutputSet,
    activated: LayerOutputSet,
    output: OutputSet,
}

impl RegressionProcessResult {
    pub fn layer_input(&self) -> &LayerInputSet {
        &self.layer_input
    }

    pub fn unactivated(&self) -> &UnactivatedLayerOutputSet {
        &self.unactivated
    }

    pub fn activated(&self) -> &LayerOutputSet {
        &self.activated
    }

    pub fn output(&self) -> &OutputSet {
        &self.output
    }
}

/// A single-layer supervised learner.
#[derive(Debug)]
pub struct Regression<D: DataSet, A: ParameterApply = MatrixMultiply> {
    cost_function: CostFunction,
    hypothesis: ActivationFunction,
    optimization_function: OptimizationFunction,
    apply_function: A,
    data_set: D,
    state: RegressionState,
    rng: StdRng,
    seed: u64,
}

impl<D: DataSet> Regression<D, MatrixMultiply> {
    /// Linear regression: identity hypothesis, half-squared cost.
    pub fn linear(data_set: D, learning_rate: f64, seed: u64) -> Result<Self> {
        Self::linear_with_cost(CostFunction::HalfSquared, data_set, learning_rate, seed)
    }

    pub fn linear_with_cost(
        cost_function: CostFunction,
        data_set: D,
        learning_rate: f64,
        seed: u64,
    ) -> Result<Self> {
        Self::with_strategies(
            cost_function,
            ActivationFunction::Identity,
            OptimizationFunction::gradient_descent(learning_rate),
            MatrixMultiply,
            data_set,
            seed,
        )
    }

    /// Logistic regression: sigmoid hypothesis, logarithmic cost.
    pub fn logistic(data_set: D, learning_rate: f64, seed: u64) -> Result<Self> {
        Self::logistic_with_cost(CostFunction::Logarithmic, data_set, learning_rate, seed)
    }

    pub fn logistic_with_cost(
        cost_function: CostFunction,
        data_set: D,
        learning_rate: f64,
        seed: u64,
    ) -> Result<Self> {
        Self::with_strategies(
            cost_function,
            ActivationFunction::Sigmoid,
            OptimizationFunction::gradient_descent(learning_rate),
            MatrixMultiply,
            data_set,
            seed,
        )
    }
}

impl<D: DataSet, A: ParameterApply> Regression<D, A> {
    pub fn with_strategies(
        cost_function: CostFunction,
        hypothesis: ActivationFunction,
        optimization_function: OptimizationFunction,
        apply_function: A,
        data_set: D,
        seed: u64,
    ) -> Result<Self> {
        optimization_function.validate()?;
        if data_set.input_size() == 0 || data_set.output_size() == 0 {
            return Err(Error::InvalidConfig(
                "dataset must have at least one input and one output feature".into(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let state = RegressionState::randomized(data_set.input_size(), data_set.output_size(), &mut rng);

        Ok(Self {
            cost_function,
            hypothesis,
            optimization_function,
            apply_function,
            data_set,
            state,
            rng,
            seed,
        })
    }

    /// The activation playing the hypothesis role.
    pub fn hypothesis(&self) -> ActivationFunction {
        self.hypothesis
    }

    pub fn optimization_function(&self) -> &OptimizationFunction {
        &self.optimization_function
    }

    pub fn weights(&self) -> &LayerWeights {
        self.state.weights()
    }

    pub fn input_size(&self) -> usize {
        self.state.weights().input_size()
    }

    pub fn output_size(&self) -> usize {
        self.state.weights().output_size()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Re-derives the initial state (and batch sampler) from the seed.
    pub fn restore_default_state(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.state = RegressionState::randomized(
            self.data_set.input_size(),
            self.data_set.output_size(),
            &mut self.rng,
        );
    }

    pub fn weight_decay_parameters(&self) -> WeightDecayParameters {
        WeightDecayParameters::unroll(&[self.state.weights().without_bias()])
    }

    /// Runs the single forward step, recording the intermediates.
    pub fn process_full(&self, input: &InputSet) -> Result<RegressionProcessResult> {
        if input.input_count() != self.input_size() {
            return Err(Error::InvalidShape(format!(
                "input has {} features but the regression expects {}",
                input.input_count(),
                self.input_size()
            )));
        }

        let layer_input = LayerInputSet::from_input(input);
        let unactivated = self.apply_function.output(&layer_input, self.state.weights());
        let activated = self.hypothesis.apply(&unactivated);
        let output = OutputSet::from_layer_output(&activated);

        Ok(RegressionProcessResult {
            layer_input,
            unactivated,
            activated,
            output,
        })
    }

    /// The analytic weight gradient for one batch; read-only on the
    /// weights.
    pub fn weight_gradient(&self, batch: &SupervisedInOutSet) -> Result<ParameterError> {
        self.check_output_size(batch)?;
        let result = self.process_full(batch.input_set())?;
        Ok(self.cost_function.weight_derivative(
            &self.weight_decay_parameters(),
            batch.output_set(),
            result.output(),
            result.layer_input(),
            self.state.weights(),
            result.unactivated(),
            result.activated(),
            self.hypothesis,
            &self.apply_function,
        ))
    }

    fn check_output_size(&self, set: &SupervisedInOutSet) -> Result<()> {
        if set.output_size() != self.output_size() {
            return Err(Error::InvalidShape(format!(
                "output has {} labels but the regression produces {}",
                set.output_size(),
                self.output_size()
            )));
        }
        Ok(())
    }

    fn train_on(&mut self, batch: &SupervisedInOutSet) -> Result<()> {
        let gradient = self.weight_gradient(batch)?;

        let mut parameters = UnrolledParameters::unroll(std::slice::from_ref(self.state.weights()));
        let errors = UnrolledParameterErrors::unroll(std::slice::from_ref(&gradient));
        self.state.optimization_state = self.optimization_function.step(
            self.state.optimization_state.take(),
            &mut parameters,
            &errors,
        );
        parameters.scatter_into(std::slice::from_mut(self.state.weights_mut()));
        Ok(())
    }
}

impl<D: DataSet, A: ParameterApply> SupervisedLearner for Regression<D, A> {
    type State = RegressionState;

    fn cost_function(&self) -> CostFunction {
        self.cost_function
    }

    fn data_set(&self) -> &dyn DataSet {
        &self.data_set
    }

    fn process(&self, input: &InputSet) -> Result<OutputSet> {
        Ok(self.process_full(input)?.output().clone())
    }

    fn cost(&self, function: Option<CostFunction>, set: &SupervisedInOutSet) -> Result<CostSet> {
        self.check_output_size(set)?;
        let actual = self.process_full(set.input_set())?;
        Ok(function.unwrap_or(self.cost_function).cost(
            &self.weight_decay_parameters(),
            set.output_set(),
            actual.output(),
        ))
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

    fn state(&self) -> &RegressionState {
        &self.state
    }

    fn restore_state(&mut self, state: RegressionState) {
        self.state = state;
    }

    fn iteration_count(&self) -> u64 {
        self.state.iteration_count()
    }
}
