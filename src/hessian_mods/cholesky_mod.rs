//! Cholesky with added multiple of the identity (Nocedal and Wright, Algorithm 6.3).
use ndarray::prelude::*;

use super::Modification;
use crate::error::NumericalFailure;
use crate::linalg;

/// Number of shifts tried before giving up.
const MAX_SHIFTS: usize = 100;

/// Finds `tau >= 0` such that `H + tau I` has a Cholesky factorisation and returns the factor
/// together with `tau`.
///
/// The first shift is zero if the diagonal of `H` is positive and half the Frobenius norm of `H`
/// otherwise. Failed shifts are doubled, but never below half the norm.
pub fn shifted_cholesky(
    h: ArrayView2<f64>,
    mach_acc: f64,
) -> Result<(Array2<f64>, f64), NumericalFailure> {
    let n = h.nrows();
    let half_norm = (0.5 * linalg::frobenius_norm(h)).max(mach_acc.sqrt());
    let min_diag = h.diag().fold(std::f64::INFINITY, |m, &v| m.min(v));
    let mut tau = if min_diag > 0.0 { 0.0 } else { half_norm };

    let eye = Array2::<f64>::eye(n);
    for _ in 0..MAX_SHIFTS {
        let shifted = &h + &(&eye * tau);
        if let Some(l) = linalg::cholesky(shifted.view()) {
            return Ok((l, tau));
        }
        tau = (2.0 * tau).max(half_norm);
    }
    Err(NumericalFailure::LinAlg(format!(
        "no positive definite shift found after {} attempts",
        MAX_SHIFTS
    )))
}

pub(super) fn modify(
    g: ArrayView1<f64>,
    h: ArrayView2<f64>,
    mach_acc: f64,
) -> Result<Modification, NumericalFailure> {
    let (l, tau) = shifted_cholesky(h, mach_acc)?;
    let pk = -linalg::cholesky_solve(l.view(), g);
    let mut matrix = h.to_owned();
    matrix.diag_mut().mapv_inplace(|v| v + tau);
    Ok(Modification { pk, matrix })
}
