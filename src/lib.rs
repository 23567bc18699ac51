//! gradnet: a small supervised-learning engine in Rust.
//!
//! Feed-forward networks, and linear/logistic regression as their
//! one-layer special case, trained by backpropagation with pluggable cost,
//! activation, parameter-apply, and optimization strategies.
//!
//! # Features
//!
//! - Hand-specialized reverse-mode differentiation through an arbitrary
//!   layer stack, with the chain order enforced by the type system.
//! - Bias learning via the ones-column trick; per-cell output masking for
//!   partially labeled examples.
//! - Whole-model optimizer updates through a flatten/step/scatter cycle.
//! - Numerically guarded cost and activation functions that never turn
//!   log(0) or exponential overflow into NaN.
//! - Central-difference gradient checking with state snapshot/restore.
//!
//! # Goals
//!
//! - Keep each of the four strategy families swappable without touching
//!   the chain-rule orchestration.
//! - Prioritize correctness and explicitness over black-box abstraction.
//! - Stay deterministic: explicit seeds everywhere, no global generator,
//!   bit-reproducible inference.
//!
//! # Modules
//!
//! - [`tensors`] — dense 2-D `f64` matrices with rayon-parallel kernels.
//! - [`values`] — typed wrappers for the roles a tensor plays.
//! - [`derivatives`] — the typed derivative chain and parameter unrolling.
//! - [`functions`] — the four strategy families.
//! - [`learner`] — the shared training/inference surface.
//! - [`network`] / [`regression`] — the multi-layer and one-layer learners.
//! - [`dataset`] — split datasets and random batch sampling.
//! - [`stateio`] — binary save/load of experiment state.
//!
//! # Example
//!
//! ```rust
//! use gradnet::prelude::*;
//!
//! # fn main() -> gradnet::error::Result<()> {
//! let input = InputSet::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]])?;
//! let output = OutputSet::from_rows(&[vec![0.0], vec![2.0], vec![4.0], vec![6.0]])?;
//! let data = StaticDataSet::with_split(input, output, 0.0, 0.0, 7)?;
//!
//! let mut model = Regression::linear(data, 0.1, 7)?;
//! for _ in 0..500 {
//!     model.train()?;
//! }
//! assert!(model.training_error()?.rms() < 1e-3);
//! # Ok(())
//! # }
//! ```

pub mod approx;
pub mod dataset;
pub mod derivatives;
pub mod error;
pub mod functions;
pub mod learner;
pub mod network;
pub mod regression;
pub mod stateio;
pub mod tensors;
pub mod values;

/// The types most programs need, in one import.
pub mod prelude {
    pub use crate::dataset::{DataSet, StaticDataSet, SupervisedInOutSet};
    pub use crate::error::{Error, Result};
    pub use crate::functions::{
        ActivationFunction, CostFunction, MatrixMultiply, OptimizationFunction, ParameterApply,
    };
    pub use crate::learner::SupervisedLearner;
    pub use crate::network::NeuralNetwork;
    pub use crate::regression::Regression;
    pub use crate::tensors::Tensor;
    pub use crate::values::{InputSet, OutputMixer, OutputSet};
}
