//! Gill, Murray and Wright modified Cholesky factorisation.
//!
//! P. E. Gill, W. Murray and M. H. Wright. Practical Optimization. Academic Press, 1981,
//! section 4.4.2.2.
//!
//! A single pass `LDL^T` factorisation with symmetric pivoting on the largest remaining diagonal
//! element. Each `d_j` is raised to at least `(theta_j / beta)^2` and `delta`, which bounds the
//! elements of `L` and keeps `D` positive. The result satisfies `L D L^T = P (H + E) P^T` for a
//! non-negative diagonal `E`.
use ndarray::prelude::*;

use super::{permute, unpermute, unpermute_vec, Modification};
use crate::error::NumericalFailure;
use crate::linalg;

/// Factors `L D L^T` of the pivoted, perturbed Hessian.
#[derive(Debug, Clone)]
pub struct GmwFactors {
    /// Row `i` of the factors belongs to variable `perm[i]`.
    pub perm: Vec<usize>,
    /// Unit lower triangular.
    pub l: Array2<f64>,
    pub d: Array1<f64>,
    /// The diagonal perturbation, in pivoted order.
    pub e: Array1<f64>,
}

impl GmwFactors {
    /// `H + E` in the original ordering.
    pub fn matrix(&self) -> Array2<f64> {
        let n = self.d.len();
        let mut m = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for k in 0..=i {
                let mut sum = 0.0;
                for s in 0..=k {
                    sum += self.l[[i, s]] * self.d[s] * self.l[[k, s]];
                }
                m[[i, k]] = sum;
                m[[k, i]] = sum;
            }
        }
        unpermute(m.view(), &self.perm)
    }

    /// Solves `(H + E) x = b` with the factors.
    pub fn solve(&self, b: ArrayView1<f64>) -> Array1<f64> {
        let bp = permute(b, &self.perm);
        let y = linalg::forward_substitution(self.l.view(), bp.view()) / &self.d;
        let x = linalg::backward_substitution(self.l.view(), y.view());
        unpermute_vec(x.view(), &self.perm)
    }
}

fn swap_symmetric(a: &mut Array2<f64>, i: usize, j: usize) {
    let n = a.nrows();
    for k in 0..n {
        a.swap([i, k], [j, k]);
    }
    for k in 0..n {
        a.swap([k, i], [k, j]);
    }
}

pub fn gmw_factorise(h: ArrayView2<f64>, mach_acc: f64) -> GmwFactors {
    let n = h.nrows();
    let mut a = h.to_owned();
    let mut perm: Vec<usize> = (0..n).collect();

    let gamma = a.diag().fold(0.0_f64, |m, v| m.max(v.abs()));
    let mut xi = 0.0_f64;
    for i in 0..n {
        for k in 0..n {
            if i != k {
                xi = xi.max(a[[i, k]].abs());
            }
        }
    }
    let delta = mach_acc * (gamma + xi).max(1.0);
    let beta_sq = if n == 1 {
        gamma.max(mach_acc)
    } else {
        gamma.max(xi / ((n * n - 1) as f64).sqrt()).max(mach_acc)
    };

    let mut c = Array2::<f64>::zeros((n, n));
    let mut l = Array2::<f64>::eye(n);
    let mut d = Array1::<f64>::zeros(n);
    let mut e = Array1::<f64>::zeros(n);
    for i in 0..n {
        c[[i, i]] = a[[i, i]];
    }

    for j in 0..n {
        let mut q = j;
        for i in j..n {
            if c[[i, i]].abs() > c[[q, q]].abs() {
                q = i;
            }
        }
        if q != j {
            swap_symmetric(&mut a, j, q);
            c.swap([j, j], [q, q]);
            for s in 0..j {
                c.swap([j, s], [q, s]);
                l.swap([j, s], [q, s]);
            }
            perm.swap(j, q);
        }

        for s in 0..j {
            l[[j, s]] = c[[j, s]] / d[s];
        }
        for i in j + 1..n {
            let mut sum = a[[i, j]];
            for s in 0..j {
                sum -= l[[j, s]] * c[[i, s]];
            }
            c[[i, j]] = sum;
        }

        let theta = (j + 1..n).fold(0.0_f64, |m, i| m.max(c[[i, j]].abs()));
        d[j] = c[[j, j]]
            .abs()
            .max(theta * theta / beta_sq)
            .max(delta);
        e[j] = d[j] - c[[j, j]];

        for i in j + 1..n {
            c[[i, i]] -= c[[i, j]] * c[[i, j]] / d[j];
        }
    }

    GmwFactors { perm, l, d, e }
}

pub(super) fn modify(g: ArrayView1<f64>, h: ArrayView2<f64>, mach_acc: f64) -> Modification {
    let factors = gmw_factorise(h, mach_acc);
    Modification {
        pk: -factors.solve(g),
        matrix: factors.matrix(),
    }
}

/// Adds the perturbation `E` back onto the Hessian and solves the perturbed system directly.
pub(super) fn modify_legacy(
    g: ArrayView1<f64>,
    h: ArrayView2<f64>,
    mach_acc: f64,
) -> Result<Modification, NumericalFailure> {
    let factors = gmw_factorise(h, mach_acc);
    let mut matrix = h.to_owned();
    for (j, &p) in factors.perm.iter().enumerate() {
        matrix[[p, p]] += factors.e[j];
    }
    let pk = -linalg::solve(matrix.view(), g)?;
    Ok(Modification { pk, matrix })
}
