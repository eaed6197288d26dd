use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{AslError, Result};

/// Dense row-major `[batch, num_labels]` tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![value; cols]; rows]
        }
    }

    /// Uniform samples in [0, 1), e.g. a batch of predicted probabilities.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);

        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = rng.gen::<f64>();
            }
        }

        res
    }

    /// Random {0, 1} labels, each positive with probability `p`.
    pub fn random_labels<R: Rng + ?Sized>(rows: usize, cols: usize, p: f64, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);

        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = if rng.gen_bool(p) { 1.0 } else { 0.0 };
            }
        }

        res
    }

    /// Builds a matrix from rows, rejecting ragged input.
    /// An empty `data` yields a 0x0 matrix.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = data.first().map_or(0, |row| row.len());
        for (row, values) in data.iter().enumerate() {
            if values.len() != cols {
                return Err(AslError::RaggedRows { row, expected: cols, found: values.len() });
            }
        }
        Ok(Matrix {
            rows: data.len(),
            cols,
            data
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    /// Element-wise combination of two equally-shaped matrices.
    ///
    /// `self` is treated as the label tensor and `other` as the prediction
    /// tensor when reporting a shape mismatch.
    pub fn zip_map<F>(&self, other: &Matrix, functor: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.ensure_same_shape(other)?;
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(other.data.iter())
                .map(|(a, b)| a.iter().zip(b.iter()).map(|(&x, &y)| functor(x, y)).collect())
                .collect(),
        })
    }

    pub fn ensure_same_shape(&self, other: &Matrix) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(AslError::ShapeMismatch {
                true_rows: self.rows,
                true_cols: self.cols,
                pred_rows: other.rows,
                pred_cols: other.cols,
            });
        }
        Ok(())
    }

    /// Smallest element; `+inf` for an empty matrix.
    pub fn min(&self) -> f64 {
        self.iter().fold(f64::INFINITY, f64::min)
    }

    /// Largest element; `-inf` for an empty matrix.
    pub fn max(&self) -> f64 {
        self.iter().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Clamps every element into `[lo, hi]`, applying the ceiling first so
    /// that `lo` wins when `lo > hi`.
    pub fn clip_by_value(&self, lo: f64, hi: f64) -> Matrix {
        self.map(|x| clip_by_value(x, lo, hi))
    }

    /// Sum over the last axis, one value per row.
    pub fn sum_rows(&self) -> Vec<f64> {
        self.data.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().flat_map(|row| row.iter().copied())
    }
}

/// Scalar form of `Matrix::clip_by_value`.
pub fn clip_by_value(x: f64, lo: f64, hi: f64) -> f64 {
    x.min(hi).max(lo)
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
