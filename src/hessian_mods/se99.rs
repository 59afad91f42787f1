//! Revised modified Cholesky factorisation of Schnabel and Eskow.
//!
//! R. B. Schnabel and E. Eskow. A revised modified Cholesky factorization algorithm. SIAM Journal
//! on Optimization 9 (1999), 1135-1148.
//!
//! Phase one runs an ordinary pivoted Cholesky factorisation while the remaining Schur complement
//! is safely positive definite. Phase two perturbs the remaining diagonal using Gerschgorin
//! bounds, and the final 2x2 block is handled through its eigenvalues.
use ndarray::prelude::*;

use super::{permute, unpermute, unpermute_vec, Modification};
use crate::linalg;

const MU: f64 = 0.1;

/// Factor `L L^T` of the pivoted, perturbed Hessian.
#[derive(Debug, Clone)]
pub struct Se99Factors {
    /// Row `i` of the factor belongs to variable `perm[i]`.
    pub perm: Vec<usize>,
    pub l: Array2<f64>,
    /// The diagonal perturbation, in pivoted order.
    pub e: Array1<f64>,
}

impl Se99Factors {
    /// `H + E` in the original ordering.
    pub fn matrix(&self) -> Array2<f64> {
        let llt = self.l.dot(&self.l.t());
        unpermute(llt.view(), &self.perm)
    }

    pub fn solve(&self, b: ArrayView1<f64>) -> Array1<f64> {
        let bp = permute(b, &self.perm);
        let x = linalg::cholesky_solve(self.l.view(), bp.view());
        unpermute_vec(x.view(), &self.perm)
    }
}

struct Work {
    a: Array2<f64>,
    l: Array2<f64>,
    perm: Vec<usize>,
}

impl Work {
    fn swap(&mut self, i: usize, j: usize) {
        let n = self.a.nrows();
        for k in 0..n {
            self.a.swap([i, k], [j, k]);
            self.l.swap([i, k], [j, k]);
        }
        for k in 0..n {
            self.a.swap([k, i], [k, j]);
        }
        self.perm.swap(i, j);
    }

    /// Eliminates column `j` and updates the trailing submatrix.
    fn eliminate(&mut self, j: usize) {
        let n = self.a.nrows();
        let ljj = self.a[[j, j]].sqrt();
        self.l[[j, j]] = ljj;
        for i in j + 1..n {
            self.l[[i, j]] = self.a[[i, j]] / ljj;
        }
        for i in j + 1..n {
            for k in j + 1..=i {
                let v = self.a[[i, k]] - self.l[[i, j]] * self.l[[k, j]];
                self.a[[i, k]] = v;
                self.a[[k, i]] = v;
            }
        }
    }
}

/// Eigenvalues `(lo, hi)` of a symmetric 2x2 matrix.
fn eigenvalues_2x2(a: f64, b: f64, c: f64) -> (f64, f64) {
    let half_trace = 0.5 * (a + c);
    let det = a * c - b * b;
    let disc = (half_trace * half_trace - det).max(0.0).sqrt();
    (half_trace - disc, half_trace + disc)
}

pub fn se99_factorise(h: ArrayView2<f64>, mach_acc: f64) -> Se99Factors {
    let n = h.nrows();
    let tau = mach_acc.cbrt();
    let tau_bar = tau * tau;

    let mut w = Work {
        a: h.to_owned(),
        l: Array2::<f64>::zeros((n, n)),
        perm: (0..n).collect(),
    };
    let mut e = Array1::<f64>::zeros(n);

    let mut gamma = w.a.diag().fold(0.0_f64, |m, v| m.max(v.abs()));
    if gamma == 0.0 {
        gamma = w.a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if gamma == 0.0 {
            gamma = 1.0;
        }
    }

    // phase one
    let mut j = 0;
    let mut phase_one = true;
    while j < n {
        let diag = w.a.diag();
        let max_diag = (j..n).fold(std::f64::NEG_INFINITY, |m, i| m.max(diag[i]));
        let min_diag = (j..n).fold(std::f64::INFINITY, |m, i| m.min(diag[i]));
        if max_diag < tau_bar * gamma || min_diag < -MU * max_diag {
            phase_one = false;
            break;
        }
        let q = (j..n).fold(j, |q, i| if w.a[[i, i]] > w.a[[q, q]] { i } else { q });
        if q != j {
            w.swap(j, q);
        }
        let ajj = w.a[[j, j]];
        let min_schur = (j + 1..n).fold(std::f64::INFINITY, |m, i| {
            m.min(w.a[[i, i]] - w.a[[i, j]] * w.a[[i, j]] / ajj)
        });
        if j + 1 < n && min_schur < -MU * gamma {
            phase_one = false;
            break;
        }
        w.eliminate(j);
        j += 1;
    }

    if !phase_one {
        if j == n - 1 {
            let ajj = w.a[[j, j]];
            let shift = -ajj + (-tau * ajj / (1.0 - tau)).max(tau_bar * gamma);
            w.a[[j, j]] += shift;
            e[j] = shift;
            w.l[[j, j]] = w.a[[j, j]].sqrt();
        } else {
            // Gerschgorin lower bounds of the remaining eigenvalues
            let mut bounds = Array1::<f64>::zeros(n);
            for i in j..n {
                let off: f64 = (j..n).filter(|&s| s != i).map(|s| w.a[[i, s]].abs()).sum();
                bounds[i] = w.a[[i, i]] - off;
            }
            let mut delta_prev = 0.0_f64;
            for k in j..n - 2 {
                let q = (k..n).fold(k, |q, i| if bounds[i] > bounds[q] { i } else { q });
                if q != k {
                    w.swap(k, q);
                    bounds.swap(k, q);
                }
                let norm_k: f64 = (k + 1..n).map(|i| w.a[[i, k]].abs()).sum();
                let shift = (-w.a[[k, k]] + norm_k.max(tau_bar * gamma))
                    .max(delta_prev)
                    .max(0.0);
                if shift > 0.0 {
                    w.a[[k, k]] += shift;
                    delta_prev = shift;
                    e[k] = shift;
                }
                let akk = w.a[[k, k]];
                if akk != norm_k {
                    let t = 1.0 - norm_k / akk;
                    for i in k + 1..n {
                        bounds[i] += w.a[[i, k]].abs() * t;
                    }
                }
                w.eliminate(k);
            }

            let (p, q) = (n - 2, n - 1);
            let (lo, hi) = eigenvalues_2x2(w.a[[p, p]], w.a[[q, p]], w.a[[q, q]]);
            let shift = (-lo + (tau * (hi - lo) / (1.0 - tau)).max(tau_bar * gamma))
                .max(delta_prev)
                .max(0.0);
            if shift > 0.0 {
                w.a[[p, p]] += shift;
                w.a[[q, q]] += shift;
                e[p] = shift;
                e[q] = shift;
            }
            let lpp = w.a[[p, p]].sqrt();
            let lqp = w.a[[q, p]] / lpp;
            w.l[[p, p]] = lpp;
            w.l[[q, p]] = lqp;
            w.l[[q, q]] = (w.a[[q, q]] - lqp * lqp).sqrt();
        }
    }

    Se99Factors {
        perm: w.perm,
        l: w.l,
        e,
    }
}

pub(super) fn modify(g: ArrayView1<f64>, h: ArrayView2<f64>, mach_acc: f64) -> Modification {
    let factors = se99_factorise(h, mach_acc);
    Modification {
        pk: -factors.solve(g),
        matrix: factors.matrix(),
    }
}
