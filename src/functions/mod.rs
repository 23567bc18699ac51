//! The four pluggable strategy families.
//!
//! Each strategy varies independently of the chain-rule orchestration:
//! [`activation::ActivationFunction`] shapes a layer's nonlinearity,
//! [`cost::CostFunction`] scores outputs and seeds the backward pass,
//! [`apply::ParameterApply`] turns inputs and weights into pre-activations,
//! and [`optimize::OptimizationFunction`] consumes flattened gradients.

pub mod activation;
pub mod apply;
pub mod cost;
pub mod optimize;

pub use activation::ActivationFunction;
pub use apply::{MatrixMultiply, ParameterApply};
pub use cost::CostFunction;
pub use optimize::{OptimizationFunction, OptimizerState};
