//! Eigenvalue modification: eigenvalues below `sqrt(mach_acc)` times the largest eigenvalue
//! magnitude (but at least `sqrt(mach_acc)`) are raised to that floor.
use ndarray::prelude::*;

use super::Modification;
use crate::error::NumericalFailure;
use crate::linalg;

/// Returns the eigenvalues after clamping, the eigenvectors and the reconstructed matrix.
pub fn clamp_eigenvalues(
    h: ArrayView2<f64>,
    mach_acc: f64,
) -> Result<(Array1<f64>, Array2<f64>, Array2<f64>), NumericalFailure> {
    let (values, vectors) = linalg::symmetric_eigen(h)?;
    let scale = values.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let floor = mach_acc.sqrt() * scale;
    let clamped = values.mapv(|v| v.max(floor));

    let b = (&vectors * &clamped).dot(&vectors.t());
    // symmetrise away the rounding of the reconstruction
    let b = 0.5 * (&b + &b.t());
    Ok((clamped, vectors, b))
}

pub(super) fn modify(
    g: ArrayView1<f64>,
    h: ArrayView2<f64>,
    mach_acc: f64,
) -> Result<Modification, NumericalFailure> {
    let (values, vectors, matrix) = clamp_eigenvalues(h, mach_acc)?;
    let coeffs = vectors.t().dot(&g) / &values;
    let pk = -vectors.dot(&coeffs);
    Ok(Modification { pk, matrix })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::AbsDiffEq;
    use float_cmp::approx_eq;

    #[test]
    fn clamps_negative_eigenvalues() {
        let h = arr2(&[[1.0, 0.0], [0.0, -4.0]]);
        let (values, _, b) = clamp_eigenvalues(h.view(), f64::EPSILON).unwrap();
        let floor = f64::EPSILON.sqrt() * 4.0;
        assert!(values.iter().all(|&v| v >= floor));
        assert!(approx_eq!(f64, b[[0, 0]], 1.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, b[[1, 1]], floor, epsilon = 1e-12));
    }

    #[test]
    fn floor_never_below_sqrt_mach_acc() {
        let h = arr2(&[[0.5, 0.0], [0.0, -0.1]]);
        let (values, _, _) = clamp_eigenvalues(h.view(), f64::EPSILON).unwrap();
        let floor = f64::EPSILON.sqrt();
        assert!(values.iter().any(|&v| v == floor));
        assert!(values.iter().any(|&v| approx_eq!(f64, v, 0.5, epsilon = 1e-12)));
    }

    #[test]
    fn positive_definite_untouched() {
        let h = arr2(&[[2.0, 1.0], [1.0, 2.0]]);
        let g = arr1(&[1.0, 1.0]);
        let m = modify(g.view(), h.view(), f64::EPSILON).unwrap();
        assert!(m.matrix.abs_diff_eq(&h, 1e-12));
        assert!(m.pk.abs_diff_eq(&arr1(&[-1.0 / 3.0, -1.0 / 3.0]), 1e-12));
    }
}
