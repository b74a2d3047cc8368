//! `Matrix`: a dense two-dimensional matrix of reals.
//!
//! A thin newtype around `nalgebra::DMatrix<f64>` exposing the handful of
//! operations the correlation and sampling code needs.

use nalgebra::DMatrix;
use pm_core::Real;
use std::ops::{Index, IndexMut, Mul};

/// A dynamically-sized 2D matrix of `Real` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix(DMatrix<Real>);

impl Matrix {
    /// Create a zero-filled `rows × cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self(DMatrix::zeros(rows, cols))
    }

    /// Create an identity matrix of size `n × n`.
    pub fn identity(n: usize) -> Self {
        Self(DMatrix::identity(n, n))
    }

    /// Create from a row-major data slice.
    pub fn from_row_slice(rows: usize, cols: usize, data: &[Real]) -> Self {
        Self(DMatrix::from_row_slice(rows, cols, data))
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.0.nrows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.0.ncols()
    }

    /// Return `true` if the matrix is square.
    pub fn is_square(&self) -> bool {
        self.0.nrows() == self.0.ncols()
    }

    /// Return `true` if square and `|m[i,j] - m[j,i]| ≤ tolerance` everywhere.
    pub fn is_symmetric(&self, tolerance: Real) -> bool {
        self.is_square()
            && (0..self.rows())
                .all(|i| (0..i).all(|j| (self.0[(i, j)] - self.0[(j, i)]).abs() <= tolerance))
    }

    /// Borrow the inner `DMatrix`.
    pub fn inner(&self) -> &DMatrix<Real> {
        &self.0
    }

    /// Consume and return the inner `DMatrix`.
    pub fn into_inner(self) -> DMatrix<Real> {
        self.0
    }

    /// Transpose.
    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Matrix-vector product `M * v`.
    pub fn mul_vec(&self, v: &[Real]) -> Vec<Real> {
        (0..self.rows())
            .map(|i| (0..self.cols()).map(|j| self.0[(i, j)] * v[j]).sum())
            .collect()
    }
}

impl From<DMatrix<Real>> for Matrix {
    fn from(m: DMatrix<Real>) -> Self {
        Self(m)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Real;
    fn index(&self, (i, j): (usize, usize)) -> &Real {
        &self.0[(i, j)]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Real {
        &mut self.0[(i, j)]
    }
}

impl Mul for &Matrix {
    type Output = Matrix;
    fn mul(self, rhs: &Matrix) -> Matrix {
        Matrix(&self.0 * &rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetry_check() {
        let sym = Matrix::from_row_slice(2, 2, &[1.0, 0.4, 0.4, 1.0]);
        let asym = Matrix::from_row_slice(2, 2, &[1.0, 0.4, 0.3, 1.0]);
        assert!(sym.is_symmetric(1e-12));
        assert!(!asym.is_symmetric(1e-12));
        assert!(!Matrix::zeros(2, 3).is_symmetric(1e-12));
    }

    #[test]
    fn mul_vec_matches_manual_product() {
        let m = Matrix::from_row_slice(2, 2, &[1.0, 0.0, 0.5, 2.0]);
        assert_eq!(m.mul_vec(&[2.0, 3.0]), vec![2.0, 7.0]);
    }
}
