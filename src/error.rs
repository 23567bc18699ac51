//! Error type for the public training and inference surface.
//!
//! Precondition violations (wrong input arity, oversized batches, bad
//! hyperparameters) are reported through [`Error`] and are fatal to the
//! current call. Numerical edge cases (overflowing exponentials, logs of
//! zero) are not errors; the strategy functions mask them with finite
//! substitutions so training never produces NaN or infinity from those
//! operations. Shape mismatches inside the tensor kernels are programmer
//! errors and panic via `assert!` instead.

use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed value data, e.g. ragged rows or mixer weights outside [0, 1].
    InvalidData(String),
    /// Bad configuration, e.g. a non-positive learning rate or batch size.
    InvalidConfig(String),
    /// A shape or size that does not match what the model expects.
    InvalidShape(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
