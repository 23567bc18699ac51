//! Saving and loading experiment state.
//!
//! # `.gnst` State Format
//!
//! A `.gnst` file stores one experiment state: the completed-iteration
//! counter followed by every layer's weight matrix, in layer order.
//!
//! ```text
//! ┌─────────────┬──────────────┬──────────────────────────┐
//! │ Header      │ Matrix N     │ Matrix N+1 …             │
//! ├─────────────┼──────────────┼──────────────────────────┤
//! │ "gnst"[4]   │ u64: rows    │ u64: rows                │
//! │ u8: count   │ u64: cols    │ u64: cols                │
//! │ u64: iters  │ [f64; rows*cols] row-major data         │
//! └─────────────┴─────────────────────────────────────────┘
//! ```
//!
//! All integers and floats are little-endian. Loaded matrices are treated
//! as untrusted input: shape/data consistency is validated before a state
//! is rebuilt, and consecutive layers must fit together.
//!
//! Optimizer state is not stored; no implemented optimizer carries any.
//! Adding one means revising this format.

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use briny::prelude::*;

use crate::network::NetworkState;
use crate::regression::RegressionState;
use crate::tensors::Tensor;
use crate::values::LayerWeights;

const STATE_MAGIC: &[u8; 4] = b"gnst";

/// Internal representation of one decoded weight matrix.
struct PackedMatrix {
    rows: u64,
    cols: u64,
    data: Vec<f64>,
}

impl Validate for PackedMatrix {
    fn validate(&self) -> Result<(), ValidationError> {
        let expected = (self.rows * self.cols) as usize;
        if self.rows == 0 || self.cols == 0 || self.data.len() != expected {
            return Err(ValidationError);
        }
        Ok(())
    }
}

fn write_state(path: &str, iterations: u64, matrices: &[&Tensor]) -> Result<(), Box<dyn Error>> {
    if matrices.len() > u8::MAX as usize {
        return Err("too many layers for the state format".into());
    }

    let mut file = BufWriter::new(File::create(path)?);

    file.write_all(STATE_MAGIC)?;
    file.write_all(&[matrices.len() as u8])?;
    file.write_all(&iterations.to_le_bytes())?;

    for matrix in matrices {
        file.write_all(&(matrix.rows() as u64).to_le_bytes())?;
        file.write_all(&(matrix.cols() as u64).to_le_bytes())?;
        for &value in matrix.data() {
            file.write_all(&value.to_le_bytes())?;
        }
    }

    Ok(())
}

fn read_state(path: &str) -> Result<(u64, Vec<LayerWeights>), Box<dyn Error>> {
    let mut file = BufReader::new(File::open(path)?);
    let mut buf8 = [0u8; 8];

    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if &magic != STATE_MAGIC {
        return Err("invalid magic header".into());
    }

    let mut count = [0u8; 1];
    file.read_exact(&mut count)?;
    let count = count[0] as usize;
    if count == 0 {
        return Err("state file contains no weight matrices".into());
    }

    file.read_exact(&mut buf8)?;
    let iterations = u64::from_le_bytes(buf8);

    let mut weights = Vec::with_capacity(count);
    for _ in 0..count {
        file.read_exact(&mut buf8)?;
        let rows = u64::from_le_bytes(buf8);
        file.read_exact(&mut buf8)?;
        let cols = u64::from_le_bytes(buf8);

        let size = (rows * cols) as usize;
        let mut data = Vec::with_capacity(size);
        for _ in 0..size {
            file.read_exact(&mut buf8)?;
            data.push(f64::from_le_bytes(buf8));
        }

        let raw = PackedMatrix { rows, cols, data };
        let trusted = TrustedData::new(raw)?;
        let inner = trusted.into_inner();
        let matrix = Tensor::new(inner.rows as usize, inner.cols as usize, inner.data);
        weights.push(LayerWeights::from_matrix(matrix)?);
    }

    Ok((iterations, weights))
}

/// Saves a network's weights and iteration counter to `path`.
///
/// # Errors
/// Returns an error if file I/O fails or the network has more than 255
/// layers.
pub fn save_network_state(path: &str, state: &NetworkState) -> Result<(), Box<dyn Error>> {
    let matrices: Vec<&Tensor> = state.weights().iter().map(|w| w.values()).collect();
    write_state(path, state.iteration_count(), &matrices)
}

/// Loads a network state saved by [`save_network_state`].
///
/// # Errors
/// Fails if the file is missing, carries the wrong magic, or decodes to
/// matrices that are inconsistent or do not stack into a network.
pub fn load_network_state(path: &str) -> Result<NetworkState, Box<dyn Error>> {
    let (iterations, weights) = read_state(path)?;
    Ok(NetworkState::restored(weights, iterations)?)
}

/// Saves a regression's weights and iteration counter to `path`.
pub fn save_regression_state(path: &str, state: &RegressionState) -> Result<(), Box<dyn Error>> {
    write_state(path, state.iteration_count(), &[state.weights().values()])
}

/// Loads a regression state saved by [`save_regression_state`].
///
/// # Errors
/// Fails if the file is missing or malformed, or if it holds more than one
/// matrix.
pub fn load_regression_state(path: &str) -> Result<RegressionState, Box<dyn Error>> {
    let (iterations, mut weights) = read_state(path)?;
    if weights.len() != 1 {
        return Err("regression state must hold exactly one weight matrix".into());
    }
    let weights = weights.remove(0);
    Ok(RegressionState::restored(weights, iterations))
}
