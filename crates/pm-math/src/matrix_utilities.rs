//! Matrix decompositions used to factor correlation matrices.
//!
//! Wraps nalgebra's Cholesky and symmetric eigen decompositions.

use crate::matrix::Matrix;
use nalgebra::DMatrix;
use pm_core::{
    errors::{Error, Result},
    Real,
};

/// Cholesky decomposition of a symmetric positive-definite matrix.
///
/// Returns the lower-triangular factor `L` such that `A = L * Lᵀ`.
pub fn cholesky_decomposition(m: &Matrix) -> Result<Matrix> {
    if !m.is_square() {
        return Err(Error::InvalidArgument("matrix must be square".into()));
    }
    match m.inner().clone().cholesky() {
        Some(chol) => Ok(Matrix::from(chol.l())),
        None => Err(Error::Runtime(
            "Cholesky decomposition failed: matrix is not positive-definite".into(),
        )),
    }
}

/// Eigenvalue decomposition of a symmetric real matrix.
///
/// Returns `(eigenvalues, eigenvectors)`; column `i` of the eigenvector
/// matrix belongs to eigenvalue `i`.
pub fn symmetric_eigen(m: &Matrix) -> Result<(Vec<Real>, Matrix)> {
    if !m.is_square() {
        return Err(Error::InvalidArgument("matrix must be square".into()));
    }
    let eigen = m.inner().clone().symmetric_eigen();
    Ok((
        eigen.eigenvalues.iter().copied().collect(),
        Matrix::from(eigen.eigenvectors),
    ))
}

/// Smallest eigenvalue of a symmetric matrix.
pub fn min_eigenvalue(m: &Matrix) -> Result<Real> {
    let (eigenvalues, _) = symmetric_eigen(m)?;
    Ok(eigenvalues.into_iter().fold(Real::INFINITY, Real::min))
}

/// Pseudo square-root of a symmetric positive-semidefinite matrix.
///
/// Computes `S` such that `S * Sᵀ ≈ M` using the eigenvalue decomposition,
/// zeroing out negative eigenvalues.
pub fn pseudo_sqrt(m: &Matrix) -> Result<Matrix> {
    let (eigenvalues, eigenvectors) = symmetric_eigen(m)?;
    let n = eigenvalues.len();
    let mut diag = DMatrix::<Real>::zeros(n, n);
    for (i, ev) in eigenvalues.iter().enumerate() {
        diag[(i, i)] = if *ev > 0.0 { ev.sqrt() } else { 0.0 };
    }
    Ok(Matrix::from(eigenvectors.into_inner() * diag))
}
