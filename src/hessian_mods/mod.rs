//! Hessian modifications: turn a possibly indefinite Hessian into a positive definite matrix so
//! that the Newton direction `-B^-1 g` is a descent direction.
//!
//! Every modification returns the direction together with the matrix `B` it was computed from,
//! which the trust region solvers reuse.

mod cholesky_mod;
mod eigenvalue;
mod gmw81;
mod se99;

pub use self::cholesky_mod::shifted_cholesky;
pub use self::eigenvalue::clamp_eigenvalues;
pub use self::gmw81::{gmw_factorise, GmwFactors};
pub use self::se99::{se99_factorise, Se99Factors};

use ndarray::prelude::*;

use crate::config::HessianMod;
use crate::error::NumericalFailure;
use crate::linalg;
use crate::utils::all_finite;

/// A search direction and the positive definite matrix that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub pk: Array1<f64>,
    pub matrix: Array2<f64>,
}

/// Applies `kind` to the Hessian `h` at a point with gradient `g`.
pub fn modify(
    kind: HessianMod,
    g: ArrayView1<f64>,
    h: ArrayView2<f64>,
    mach_acc: f64,
) -> Result<Modification, NumericalFailure> {
    let res = match kind {
        HessianMod::Unmodified => unmodified(g, h)?,
        HessianMod::Eigenvalue => eigenvalue::modify(g, h, mach_acc)?,
        HessianMod::Cholesky => cholesky_mod::modify(g, h, mach_acc)?,
        HessianMod::Gmw => gmw81::modify(g, h, mach_acc),
        HessianMod::GmwLegacy => gmw81::modify_legacy(g, h, mach_acc)?,
        HessianMod::Se99 => se99::modify(g, h, mach_acc),
    };
    if !all_finite(res.pk.view()) || !all_finite(res.matrix.view()) {
        return Err(NumericalFailure::LinAlg(format!(
            "the {} Hessian modification produced non-finite values",
            kind
        )));
    }
    Ok(res)
}

/// The plain Newton direction `-H^-1 g`.
fn unmodified(g: ArrayView1<f64>, h: ArrayView2<f64>) -> Result<Modification, NumericalFailure> {
    let pk = -linalg::solve(h, g)?;
    Ok(Modification {
        pk,
        matrix: h.to_owned(),
    })
}

/// Maps a matrix given in pivoted order back to the original ordering, where row `i` of `m`
/// belongs to the variable `perm[i]`.
fn unpermute(m: ArrayView2<f64>, perm: &[usize]) -> Array2<f64> {
    let n = perm.len();
    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for k in 0..n {
            out[[perm[i], perm[k]]] = m[[i, k]];
        }
    }
    out
}

fn permute(v: ArrayView1<f64>, perm: &[usize]) -> Array1<f64> {
    perm.iter().map(|&p| v[p]).collect()
}

fn unpermute_vec(v: ArrayView1<f64>, perm: &[usize]) -> Array1<f64> {
    let mut out = Array1::<f64>::zeros(v.len());
    for (i, &p) in perm.iter().enumerate() {
        out[p] = v[i];
    }
    out
}
