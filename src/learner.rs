//! The shared surface of every supervised learner.
//!
//! A learner owns its dataset, its strategy functions, and an experiment
//! state (weights, optional optimizer state, iteration counter). Inference
//! through [`process`](SupervisedLearner::process) is read-only and
//! deterministic; training takes `&mut self`, so the borrow checker
//! enforces that no inference call can observe a half-applied update.

use crate::dataset::{DataSet, SupervisedInOutSet};
use crate::error::Result;
use crate::functions::cost::CostFunction;
use crate::values::{CostSet, InputSet, OutputSet};

/// One supervised model: inference, one-step training, and the error
/// surface over its dataset's partitions.
pub trait SupervisedLearner {
    /// The deep-clonable experiment state (weights, optimizer state,
    /// iteration counter).
    type State: Clone;

    /// The cost function training minimizes.
    fn cost_function(&self) -> CostFunction;

    /// The dataset this learner draws batches and error sets from.
    fn data_set(&self) -> &dyn DataSet;

    /// Runs the forward pass on a batch of inputs.
    ///
    /// Pure with respect to the model: identical weights and inputs yield
    /// bit-identical outputs.
    fn process(&self, input: &InputSet) -> Result<OutputSet>;

    /// Cost of this learner's predictions on `set`, under `function` or
    /// the learner's own cost function when `None`.
    fn cost(&self, function: Option<CostFunction>, set: &SupervisedInOutSet) -> Result<CostSet>;

    /// Runs one full training step on a random batch of `batch_size`
    /// examples: forward pass, backward pass, parameter update, and one
    /// iteration-counter increment, or no mutation at all on error.
    fn train_batch(&mut self, batch_size: usize) -> Result<()>;

    /// Current experiment state.
    fn state(&self) -> &Self::State;

    /// Replaces the experiment state wholesale.
    fn restore_state(&mut self, state: Self::State);

    /// Completed training steps. Checkpoint and restore do not change it.
    fn iteration_count(&self) -> u64;

    /// Runs one training step on the full training set.
    fn train(&mut self) -> Result<()> {
        let size = self.data_set().training_set().size();
        self.train_batch(size)
    }

    /// Cost on the training partition under the learner's cost function.
    fn training_error(&self) -> Result<CostSet> {
        self.cost(None, self.data_set().training_set().inner())
    }

    /// Cost on the training partition under `function`.
    fn training_error_with(&self, function: CostFunction) -> Result<CostSet> {
        self.cost(Some(function), self.data_set().training_set().inner())
    }

    /// Cost on the validation partition under the learner's cost function.
    fn validation_error(&self) -> Result<CostSet> {
        self.cost(None, self.data_set().validation_set().inner())
    }

    /// Cost on the validation partition under `function`.
    fn validation_error_with(&self, function: CostFunction) -> Result<CostSet> {
        self.cost(Some(function), self.data_set().validation_set().inner())
    }

    /// Cost on the test partition under the learner's cost function.
    fn error(&self) -> Result<CostSet> {
        self.cost(None, self.data_set().test_set().inner())
    }

    /// Cost on the test partition under `function`.
    fn error_with(&self, function: CostFunction) -> Result<CostSet> {
        self.cost(Some(function), self.data_set().test_set().inner())
    }

    /// Predictions for the test partition's inputs.
    fn process_test_set(&self) -> Result<OutputSet> {
        self.process(self.data_set().test_set().inner().input_set())
    }
}
