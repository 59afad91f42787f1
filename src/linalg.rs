//! Dense linear algebra used by the Hessian modifications and the trust region solvers.
//!
//! Cholesky factorisation and the triangular solves work directly on `ndarray` storage; general
//! solves and symmetric eigendecompositions are delegated to `nalgebra`.
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::prelude::*;

use crate::error::NumericalFailure;
use crate::utils::all_finite;

/// Lower triangular Cholesky factor of a symmetric matrix, `None` unless positive definite.
pub fn cholesky(a: ArrayView2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solves `L y = b` for lower triangular `L`.
pub fn forward_substitution(l: ArrayView2<f64>, b: ArrayView1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }
    y
}

/// Solves `L^T x = y` for lower triangular `L`.
pub fn backward_substitution(l: ArrayView2<f64>, y: ArrayView1<f64>) -> Array1<f64> {
    let n = y.len();
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in i + 1..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Solves `L L^T x = b` given the Cholesky factor `L`.
pub fn cholesky_solve(l: ArrayView2<f64>, b: ArrayView1<f64>) -> Array1<f64> {
    let y = forward_substitution(l, b);
    backward_substitution(l, y.view())
}

fn to_nalgebra(a: ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Solves the general system `A x = b` by LU decomposition with partial pivoting.
pub fn solve(a: ArrayView2<f64>, b: ArrayView1<f64>) -> Result<Array1<f64>, NumericalFailure> {
    let rhs = DVector::from_iterator(b.len(), b.iter().cloned());
    let x = to_nalgebra(a)
        .lu()
        .solve(&rhs)
        .ok_or_else(|| NumericalFailure::LinAlg("Singular matrix".to_string()))?;
    let x = Array1::from(x.iter().cloned().collect::<Vec<_>>());
    if !all_finite(x.view()) {
        return Err(NumericalFailure::LinAlg("Singular matrix".to_string()));
    }
    Ok(x)
}

/// Eigenvalues and eigenvectors (as columns) of a symmetric matrix.
pub fn symmetric_eigen(a: ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>), NumericalFailure> {
    let n = a.nrows();
    let eig = SymmetricEigen::try_new(to_nalgebra(a), f64::EPSILON, 1000).ok_or_else(|| {
        NumericalFailure::LinAlg("Eigenvalues did not converge".to_string())
    })?;
    let values = Array1::from(eig.eigenvalues.iter().cloned().collect::<Vec<_>>());
    let vectors = Array2::from_shape_fn((n, n), |(i, j)| eig.eigenvectors[(i, j)]);
    Ok((values, vectors))
}

pub fn frobenius_norm(a: ArrayView2<f64>) -> f64 {
    a.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// `x^T A x`.
pub fn quadratic_form(a: ArrayView2<f64>, x: ArrayView1<f64>) -> f64 {
    x.dot(&a.dot(&x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::AbsDiffEq;
    use float_cmp::approx_eq;

    #[test]
    fn cholesky_factor() {
        let a = arr2(&[[4.0, 2.0], [2.0, 3.0]]);
        let l = cholesky(a.view()).unwrap();
        assert_eq!(l[[0, 0]], 2.0);
        assert_eq!(l[[0, 1]], 0.0);
        assert!(l.dot(&l.t()).abs_diff_eq(&a, 1e-12));

        let x = cholesky_solve(l.view(), arr1(&[2.0, 1.0]).view());
        assert!(a.dot(&x).abs_diff_eq(&arr1(&[2.0, 1.0]), 1e-12));
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        assert!(cholesky(arr2(&[[0.0, 1.0], [1.0, 0.0]]).view()).is_none());
        assert!(cholesky(arr2(&[[1.0, 0.0], [0.0, 0.0]]).view()).is_none());
    }

    #[test]
    fn lu_solve() {
        let a = arr2(&[[0.0, 1.0], [1.0, 0.0]]);
        let x = solve(a.view(), arr1(&[3.0, 5.0]).view()).unwrap();
        assert!(approx_eq!(f64, x[0], 5.0, ulps = 2));
        assert!(approx_eq!(f64, x[1], 3.0, ulps = 2));

        let singular = arr2(&[[1.0, 2.0], [2.0, 4.0]]);
        assert!(solve(singular.view(), arr1(&[1.0, 1.0]).view()).is_err());
    }

    #[test]
    fn eigen() {
        let a = arr2(&[[2.0, 1.0], [1.0, 2.0]]);
        let (values, vectors) = symmetric_eigen(a.view()).unwrap();
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(approx_eq!(f64, sorted[0], 1.0, epsilon = 1e-10));
        assert!(approx_eq!(f64, sorted[1], 3.0, epsilon = 1e-10));
        let rebuilt = vectors.dot(&Array2::from_diag(&values)).dot(&vectors.t());
        assert!(rebuilt.abs_diff_eq(&a, 1e-10));
    }
}
