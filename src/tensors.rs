//! Dense 2-D tensor for example-batched numeric data.
//!
//! Everything this engine touches is a matrix of `f64`: rows index
//! examples, columns index features or labels (weight matrices instead use
//! rows for inputs and columns for outputs). The tensor is deliberately
//! fixed to two dimensions with a flat row-major buffer.
//!
//! # Operations
//!
//! - Construction from shapes, nested rows, or a seeded standard-normal
//!   fill for weight initialization
//! - Elementwise maps and zips, scalar scaling
//! - Matrix multiplication and transposition
//! - Column reductions (sums) and whole-tensor sums
//! - Bias-column helpers (prepend a ones column, drop the first
//!   column/row) and row gathering for shuffles and batches
//!
//! # Design Highlights
//!
//! - Matrix multiplication parallelizes over output rows with
//!   [`rayon`](https://docs.rs/rayon); inner accumulation stays sequential,
//!   so results are bit-deterministic regardless of thread scheduling.
//! - Reductions are sequential for the same reason.
//! - Shape mismatches are programmer errors and panic; the typed wrappers
//!   in [`crate::values`] validate user-facing data before it gets here.

use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

/// A dense row-major matrix of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Tensor {
    /// Creates a tensor from a flat row-major buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            rows * cols,
            data.len(),
            "shape ({rows}, {cols}) is incompatible with {} data elements",
            data.len()
        );
        Self { rows, cols, data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 1.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self::new(rows, cols, vec![value; rows * cols])
    }

    /// Fills a tensor with i.i.d. standard-normal samples from `rng`.
    pub fn randn(rows: usize, cols: usize, rng: &mut impl Rng) -> Self {
        let data = (0..rows * cols)
            .map(|_| rng.sample(StandardNormal))
            .collect();
        Self::new(rows, cols, data)
    }

    /// Builds a tensor from nested rows, or `None` if the rows are ragged
    /// or there are no columns.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first()?.len();
        if cols == 0 || rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            data.extend_from_slice(row);
        }
        Some(Self::new(rows.len(), cols, data))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// # Panics
    /// Panics if the indices are out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        self.data[row * self.cols + col]
    }

    /// # Panics
    /// Panics if the indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        self.data[row * self.cols + col] = value;
    }

    /// Replaces this tensor's contents with another tensor of the same shape.
    ///
    /// # Panics
    /// Panics if shapes do not match.
    pub fn update(&mut self, mut other: Tensor) {
        assert_eq!(
            (self.rows, self.cols),
            (other.rows, other.cols),
            "shape mismatch"
        );
        std::mem::swap(&mut self.data, &mut other.data);
    }

    /// Matrix product `self × other`, parallelized over output rows.
    ///
    /// # Panics
    /// Panics if `self.cols() != other.rows()`.
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        let (m, k, n) = (self.rows, self.cols, other.cols);
        assert_eq!(k, other.rows, "matmul shape mismatch");

        let a = &self.data;
        let b = &other.data;
        let mut out = vec![0.0; m * n];

        out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
            for (j, slot) in row.iter_mut().enumerate() {
                let mut sum = 0.0;
                for l in 0..k {
                    sum += a[i * k + l] * b[l * n + j];
                }
                *slot = sum;
            }
        });

        Tensor::new(m, n, out)
    }

    pub fn transpose(&self) -> Tensor {
        let mut out = vec![0.0; self.data.len()];
        for r in 0..self.rows {
            for c in 0..self.cols {
                out[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        Tensor::new(self.cols, self.rows, out)
    }

    /// Applies `f` to every element, in parallel.
    pub fn map(&self, f: impl Fn(f64) -> f64 + Sync + Send) -> Tensor {
        let data = self.data.par_iter().map(|&x| f(x)).collect();
        Tensor::new(self.rows, self.cols, data)
    }

    /// Applies `f` to corresponding element pairs, in parallel.
    ///
    /// # Panics
    /// Panics if shapes do not match.
    pub fn zip_map(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64 + Sync + Send) -> Tensor {
        assert_eq!(
            (self.rows, self.cols),
            (other.rows, other.cols),
            "elementwise shape mismatch"
        );
        let data = self
            .data
            .par_iter()
            .zip(other.data.par_iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Tensor::new(self.rows, self.cols, data)
    }

    pub fn add(&self, other: &Tensor) -> Tensor {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor) -> Tensor {
        self.zip_map(other, |a, b| a - b)
    }

    /// Elementwise (Hadamard) product.
    pub fn mul(&self, other: &Tensor) -> Tensor {
        self.zip_map(other, |a, b| a * b)
    }

    pub fn scale(&self, factor: f64) -> Tensor {
        self.map(|x| x * factor)
    }

    /// Sums each column over the example dimension into a `1 × cols` tensor.
    pub fn column_sums(&self) -> Tensor {
        let mut sums = vec![0.0; self.cols];
        for r in 0..self.rows {
            for c in 0..self.cols {
                sums[c] += self.data[r * self.cols + c];
            }
        }
        Tensor::new(1, self.cols, sums)
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Returns a copy with a leading column of ones prepended (the bias
    /// trick).
    pub fn with_leading_ones(&self) -> Tensor {
        let cols = self.cols + 1;
        let mut data = Vec::with_capacity(self.rows * cols);
        for r in 0..self.rows {
            data.push(1.0);
            data.extend_from_slice(&self.data[r * self.cols..(r + 1) * self.cols]);
        }
        Tensor::new(self.rows, cols, data)
    }

    /// Returns a copy with the first column dropped.
    ///
    /// # Panics
    /// Panics if there is no column to drop.
    pub fn without_first_column(&self) -> Tensor {
        assert!(self.cols >= 1, "no column to drop");
        let cols = self.cols - 1;
        let mut data = Vec::with_capacity(self.rows * cols);
        for r in 0..self.rows {
            data.extend_from_slice(&self.data[r * self.cols + 1..(r + 1) * self.cols]);
        }
        Tensor::new(self.rows, cols, data)
    }

    /// Returns a copy with the first row dropped.
    ///
    /// # Panics
    /// Panics if there is no row to drop.
    pub fn without_first_row(&self) -> Tensor {
        assert!(self.rows >= 1, "no row to drop");
        Tensor::new(self.rows - 1, self.cols, self.data[self.cols..].to_vec())
    }

    /// Gathers the given rows, in order, into a new tensor.
    ///
    /// # Panics
    /// Panics if any index is out of bounds.
    pub fn gather_rows(&self, indices: &[usize]) -> Tensor {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &r in indices {
            assert!(r < self.rows, "row index out of bounds");
            data.extend_from_slice(&self.data[r * self.cols..(r + 1) * self.cols]);
        }
        Tensor::new(indices.len(), self.cols, data)
    }

    /// Copies the rows in `[from, to)` into a new tensor.
    ///
    /// # Panics
    /// Panics if the range is out of bounds or reversed.
    pub fn slice_rows(&self, from: usize, to: usize) -> Tensor {
        assert!(from <= to && to <= self.rows, "row range out of bounds");
        Tensor::new(
            to - from,
            self.cols,
            self.data[from * self.cols..to * self.cols].to_vec(),
        )
    }
}
