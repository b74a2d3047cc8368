//! Correlation matrices over named variables.

use crate::matrix::Matrix;
use crate::matrix_utilities::{cholesky_decomposition, min_eigenvalue, pseudo_sqrt};
use pm_core::{ensure_config, errors::Result, Real};
use std::collections::HashMap;

/// Tolerance for symmetry, unit-diagonal, and eigenvalue checks.
const TOLERANCE: Real = 1e-10;

/// A validated correlation matrix whose rows and columns are labelled by
/// variable name.
///
/// Invariants: square, symmetric, unit diagonal, entries in `[-1, 1]`,
/// positive semi-definite, names unique.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    matrix: Matrix,
}

impl CorrelationMatrix {
    /// Wrap `matrix` after validating it against the invariants.
    pub fn new(names: Vec<String>, matrix: Matrix) -> Result<Self> {
        ensure_config!(
            matrix.is_square() && matrix.rows() == names.len(),
            "correlation matrix is {}x{} but labels {} variables",
            matrix.rows(),
            matrix.cols(),
            names.len()
        );
        let mut seen = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            ensure_config!(
                seen.insert(name.as_str(), i).is_none(),
                "variable '{name}' appears twice in the correlation matrix"
            );
        }
        ensure_config!(
            matrix.is_symmetric(TOLERANCE),
            "correlation matrix is not symmetric"
        );
        for i in 0..matrix.rows() {
            ensure_config!(
                (matrix[(i, i)] - 1.0).abs() <= TOLERANCE,
                "diagonal entry for '{}' is {}, expected 1",
                names[i],
                matrix[(i, i)]
            );
            for j in 0..i {
                let rho = matrix[(i, j)];
                ensure_config!(
                    rho.is_finite() && (-1.0..=1.0).contains(&rho),
                    "correlation between '{}' and '{}' is {rho}, outside [-1, 1]",
                    names[i],
                    names[j]
                );
            }
        }
        if !names.is_empty() {
            let lambda = min_eigenvalue(&matrix)?;
            ensure_config!(
                lambda >= -TOLERANCE,
                "correlation matrix is not positive semi-definite \
                 (smallest eigenvalue {lambda:.3e})"
            );
        }
        Ok(Self { names, matrix })
    }

    /// Build from pairwise entries; unspecified off-diagonal entries are 0.
    pub fn from_pairs<S: AsRef<str>>(names: &[S], pairs: &[(&str, &str, Real)]) -> Result<Self> {
        let names: Vec<String> = names.iter().map(|s| s.as_ref().to_string()).collect();
        let index: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        let mut matrix = Matrix::identity(names.len());
        for &(a, b, rho) in pairs {
            let (Some(&i), Some(&j)) = (index.get(a), index.get(b)) else {
                return Err(pm_core::Error::Configuration(format!(
                    "correlation pair ('{a}', '{b}') names an unknown variable"
                )));
            };
            ensure_config!(i != j, "correlation pair ('{a}', '{b}') is on the diagonal");
            matrix[(i, j)] = rho;
            matrix[(j, i)] = rho;
        }
        Self::new(names, matrix)
    }

    /// The identity correlation over `names`.
    pub fn identity<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::from_pairs(names, &[])
    }

    /// Variable labels in row order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of variables.
    pub fn size(&self) -> usize {
        self.names.len()
    }

    /// Row/column of `name`, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Correlation between two named variables; `None` if either is absent.
    pub fn get(&self, a: &str, b: &str) -> Option<Real> {
        Some(self.matrix[(self.position(a)?, self.position(b)?)])
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Restrict to `names`, in that order.
    ///
    /// Names absent from this matrix enter as uncorrelated. A principal
    /// sub-matrix of a PSD matrix is PSD, so the result is valid.
    pub fn restricted_to<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let positions: Vec<Option<usize>> =
            names.iter().map(|n| self.position(n.as_ref())).collect();
        let n = names.len();
        let mut matrix = Matrix::identity(n);
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                if let (Some(pi), Some(pj)) = (positions[i], positions[j]) {
                    matrix[(i, j)] = self.matrix[(pi, pj)];
                }
            }
        }
        Self::new(names.iter().map(|s| s.as_ref().to_string()).collect(), matrix)
    }

    /// A factor `L` with `L * Lᵀ = C`.
    ///
    /// Lower-triangular Cholesky when the matrix is positive definite; the
    /// eigen-based pseudo square root when it is only semi-definite.
    pub fn factor(&self) -> Result<Matrix> {
        if min_eigenvalue(&self.matrix)? > TOLERANCE {
            if let Ok(l) = cholesky_decomposition(&self.matrix) {
                return Ok(l);
            }
        }
        pseudo_sqrt(&self.matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rejects_non_psd_matrix() {
        // Pairwise correlations that cannot coexist.
        let err = CorrelationMatrix::from_pairs(
            &["a", "b", "c"],
            &[("a", "b", 0.9), ("b", "c", 0.9), ("a", "c", -0.9)],
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn rejects_malformed_matrices() {
        let asym = Matrix::from_row_slice(2, 2, &[1.0, 0.5, 0.4, 1.0]);
        assert!(CorrelationMatrix::new(vec!["a".into(), "b".into()], asym).is_err());

        let bad_diag = Matrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 1.0]);
        assert!(CorrelationMatrix::new(vec!["a".into(), "b".into()], bad_diag).is_err());

        let out_of_range = Matrix::from_row_slice(2, 2, &[1.0, 1.5, 1.5, 1.0]);
        assert!(CorrelationMatrix::new(vec!["a".into(), "b".into()], out_of_range).is_err());

        assert!(CorrelationMatrix::from_pairs(&["a", "a"], &[]).is_err());
        assert!(CorrelationMatrix::from_pairs(&["a"], &[("a", "z", 0.1)]).is_err());
    }

    #[test]
    fn restriction_keeps_entries_and_adds_independent_names() {
        let c = CorrelationMatrix::from_pairs(
            &["a", "b", "c"],
            &[("a", "b", 0.4), ("b", "c", 0.2)],
        )
        .unwrap();
        let r = c.restricted_to(&["c", "b", "new"]).unwrap();
        assert_eq!(r.get("c", "b"), Some(0.2));
        assert_eq!(r.get("b", "new"), Some(0.0));
        assert_eq!(r.get("a", "b"), None);
    }

    #[test]
    fn factor_reproduces_matrix_for_definite_and_singular_input() {
        let definite = CorrelationMatrix::from_pairs(&["a", "b"], &[("a", "b", 0.5)]).unwrap();
        let singular = CorrelationMatrix::from_pairs(&["a", "b"], &[("a", "b", 1.0)]).unwrap();
        for c in [definite, singular] {
            let l = c.factor().unwrap();
            let back = &l * &l.transpose();
            for i in 0..2 {
                for j in 0..2 {
                    assert_abs_diff_eq!(back[(i, j)], c.matrix()[(i, j)], epsilon = 1e-10);
                }
            }
        }
    }
}
