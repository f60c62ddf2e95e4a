use rand::prelude::Distribution;
use rand::Rng;
use std::{error, fmt, ops};

use super::net::{Net, SizeMismatch};

/// Dense row-major matrix of `f64` values.
///
/// The shape is fixed at construction. Every binary operation checks shapes
/// before writing anything, so a failed call leaves both operands untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,

    /// Entries stored row after row:
    /// `data = [row_0][row_1] ... [row_N]`
    data: Box<[f64]>,
}

impl Matrix {
    /// Returns zero-filled matrix of the given shape.
    ///
    /// # Returns
    /// * `Ok(Matrix)` if both `rows` and `cols` are positive and their
    /// product fits in `usize`;
    /// * `Err(MatrixError::InvalidDimension)` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::feedforward::Matrix;
    /// let m = Matrix::new(2, 3).unwrap();
    /// assert_eq!(m.shape(), (2, 3));
    /// assert!(m.as_slice().iter().all(|&x| x == 0.0));
    /// assert!(Matrix::new(0, 3).is_err());
    /// ```
    pub fn new(rows: usize, cols: usize) -> Result<Matrix, MatrixError> {
        let len = Matrix::checked_len(rows, cols)?;
        Ok(Matrix {
            rows,
            cols,
            data: vec![0.0; len].into_boxed_slice(),
        })
    }

    /// Builds matrix from row-major `data`.
    ///
    /// # Returns
    /// * `Err(MatrixError::InvalidDimension)` if a dimension is zero or
    /// `rows * cols` overflows;
    /// * `Err(MatrixError::BadData)` if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix, MatrixError> {
        let len = Matrix::checked_len(rows, cols)?;
        if data.len() != len {
            return Err(MatrixError::BadData(SizeMismatch {
                expected: len,
                got: data.len(),
            }));
        }
        Ok(Matrix {
            rows,
            cols,
            data: data.into_boxed_slice(),
        })
    }

    /// Builds `1 x N` matrix holding `data`.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::feedforward::Matrix;
    /// let v = Matrix::row_vector(vec![0.5, 0.25]).unwrap();
    /// assert_eq!(v.shape(), (1, 2));
    /// ```
    pub fn row_vector(data: Vec<f64>) -> Result<Matrix, MatrixError> {
        Matrix::from_vec(1, data.len(), data)
    }

    /// Returns matrix of the given shape with random entries from range [-1,1).
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        rng: &mut R,
    ) -> Result<Matrix, MatrixError> {
        let mut matrix = Matrix::new(rows, cols)?;
        matrix.randomize(rng);
        Ok(matrix)
    }

    /// Number of entries in a `rows x cols` matrix.
    fn checked_len(rows: usize, cols: usize) -> Result<usize, MatrixError> {
        match rows.checked_mul(cols) {
            Some(len) if len > 0 => Ok(len),
            _ => Err(MatrixError::InvalidDimension { rows, cols }),
        }
    }

    /// Overwrites every entry with an independent uniform sample from [-1,1).
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let between = rand::distributions::Uniform::from(-1.0..1.0);
        for x in self.data.iter_mut() {
            *x = between.sample(rng);
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Returns slice of the `row`-th row.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    fn mismatch(&self, op: &'static str, other: &Matrix) -> MatrixError {
        MatrixError::DimensionMismatch {
            op,
            left: self.shape(),
            right: other.shape(),
        }
    }

    /// Calculates matrix product `self * other`.
    ///
    /// Each output cell is the dot product of a row of `self` and a column of
    /// `other`, summed in ascending order of the shared index.
    ///
    /// # Returns
    /// * `Ok(Matrix)` of shape `(self.rows, other.cols)`;
    /// * `Err(MatrixError::DimensionMismatch)` if `self.cols != other.rows`.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::feedforward::Matrix;
    /// let a = Matrix::from_vec(1, 2, vec![1.0, 2.0]).unwrap();
    /// let b = Matrix::from_vec(2, 2, vec![3.0, 4.0, 5.0, 6.0]).unwrap();
    /// assert_eq!(a.multiply(&b).unwrap().as_slice(), &[13.0, 16.0]);
    /// assert!(b.multiply(&a).is_err());
    /// ```
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        if self.cols != other.rows {
            return Err(self.mismatch("multiply", other));
        }

        let mut product = Matrix::new(self.rows, other.cols)?;
        for (a_row, out_row) in self
            .data
            .chunks(self.cols)
            .zip(product.data.chunks_mut(other.cols))
        {
            // Walking `other` row by row keeps both inner accesses contiguous
            for (&a, b_row) in a_row.iter().zip(other.data.chunks(other.cols)) {
                for (out, &b) in out_row.iter_mut().zip(b_row.iter()) {
                    *out += a * b;
                }
            }
        }
        Ok(product)
    }

    /// Calculates `self * transpose(other)` without building the transpose.
    ///
    /// # Returns
    /// * `Ok(Matrix)` of shape `(self.rows, other.rows)`;
    /// * `Err(MatrixError::DimensionMismatch)` if `self.cols != other.cols`.
    pub fn multiply_transposed(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        if self.cols != other.cols {
            return Err(self.mismatch("multiply_transposed", other));
        }

        let mut product = Matrix::new(self.rows, other.rows)?;
        for (a_row, out_row) in self
            .data
            .chunks(self.cols)
            .zip(product.data.chunks_mut(other.rows))
        {
            for (out, b_row) in out_row.iter_mut().zip(other.data.chunks(other.cols)) {
                *out = a_row.iter().zip(b_row.iter()).map(|(a, b)| a * b).sum();
            }
        }
        Ok(product)
    }

    /// Adds `other` into `self` elementwise, optionally squashing each sum
    /// with sigmoid in the same pass.
    ///
    /// # Returns
    /// * `Ok(())` if the shapes are identical;
    /// * `Err(MatrixError::DimensionMismatch)` otherwise, with `self` unchanged.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::feedforward::Matrix;
    /// let mut a = Matrix::row_vector(vec![1.0, -1.0]).unwrap();
    /// let b = Matrix::row_vector(vec![-1.0, 1.0]).unwrap();
    /// a.add_in_place(&b, true).unwrap();
    /// assert_eq!(a.as_slice(), &[0.5, 0.5]);
    /// ```
    pub fn add_in_place(&mut self, other: &Matrix, activate: bool) -> Result<(), MatrixError> {
        if self.shape() != other.shape() {
            return Err(self.mismatch("add_in_place", other));
        }

        if activate {
            for (x, &y) in self.data.iter_mut().zip(other.data.iter()) {
                *x = Net::sigmoid(*x + y);
            }
        } else {
            for (x, &y) in self.data.iter_mut().zip(other.data.iter()) {
                *x += y;
            }
        }
        Ok(())
    }

    /// Multiplies every entry by `factor`. Factor `0.0` resets the matrix.
    pub fn scale(&mut self, factor: f64) {
        for x in self.data.iter_mut() {
            *x *= factor;
        }
    }

    /// Accumulates outer product: `self[j, i] += column[j] * row[i]`.
    ///
    /// # Returns
    /// * `Ok(())` if `column.len() == self.rows` and `row.len() == self.cols`;
    /// * `Err(MatrixError::OuterProductMismatch)` otherwise.
    pub fn add_outer_product(&mut self, column: &[f64], row: &[f64]) -> Result<(), MatrixError> {
        if column.len() != self.rows || row.len() != self.cols {
            return Err(MatrixError::OuterProductMismatch {
                shape: self.shape(),
                column: column.len(),
                row: row.len(),
            });
        }

        for (&c, out_row) in column.iter().zip(self.data.chunks_mut(self.cols)) {
            for (out, &r) in out_row.iter_mut().zip(row.iter()) {
                *out += c * r;
            }
        }
        Ok(())
    }
}

impl ops::Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(col < self.cols, "column {} out of {}", col, self.cols);
        &self.data[row * self.cols + col]
    }
}

impl ops::IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(col < self.cols, "column {} out of {}", col, self.cols);
        &mut self.data[row * self.cols + col]
    }
}

/// Error structure for `Matrix` construction and arithmetic
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixError {
    InvalidDimension {
        rows: usize,
        cols: usize,
    },
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    OuterProductMismatch {
        shape: (usize, usize),
        column: usize,
        row: usize,
    },
    BadData(SizeMismatch),
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            MatrixError::InvalidDimension { rows, cols } => write!(
                f,
                "Matrix must have positive dimensions, but got {}x{}!",
                rows, cols
            ),
            MatrixError::DimensionMismatch { op, left, right } => write!(
                f,
                "Can't {} {}x{} and {}x{} matrices!",
                op, left.0, left.1, right.0, right.1
            ),
            MatrixError::OuterProductMismatch { shape, column, row } => write!(
                f,
                "Outer product of {} and {} values doesn't fit {}x{} matrix!",
                column, row, shape.0, shape.1
            ),
            MatrixError::BadData(SizeMismatch { expected, got }) => write!(
                f,
                "Expected {} matrix entries, but got {}!",
                expected, got
            ),
        }
    }
}

impl error::Error for MatrixError {}
