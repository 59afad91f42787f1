//! Trust region Newton method (Nocedal and Wright, chapter 4).
//!
//! Each iteration minimises the quadratic model `m(p) = f + g.p + p.B.p / 2` within the ball
//! `|p| <= delta`, where `B` is the Hessian after the configured modification. The radius is then
//! adapted by comparing the actual reduction of `f` with the reduction predicted by the model
//! built on the true Hessian (Algorithm 4.1).
use log::debug;
use ndarray::prelude::*;

use crate::config::{Configuration, HessianMod, TrustRegionSolver};
use crate::error::NumericalFailure;
use crate::hessian_mods;
use crate::linalg;

const EXACT_ITERATIONS: usize = 3;
const RADIUS_TOL: f64 = 1e-5;

/// Radius bookkeeping of one run. `0 < delta <= delta_max` holds throughout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustRegionState {
    pub delta: f64,
    pub delta_max: f64,
    /// Reduction ratio of the last trial step.
    pub rho: f64,
}

fn norm(v: ArrayView1<f64>) -> f64 {
    v.dot(&v).sqrt()
}

/// `(rho, predicted)` for the step `pk`. A NaN trial value counts as `+inf`.
fn reduction_ratio(
    fk: f64,
    fk_new: f64,
    dfk: ArrayView1<f64>,
    d2fk: ArrayView2<f64>,
    pk: ArrayView1<f64>,
) -> (f64, f64) {
    let fk_new = if fk_new.is_nan() {
        std::f64::INFINITY
    } else {
        fk_new
    };
    let actual = fk - fk_new;
    let predicted = -dfk.dot(&pk) - 0.5 * linalg::quadratic_form(d2fk, pk);
    let rho = if predicted == 0.0 {
        std::f64::INFINITY
    } else {
        actual / predicted
    };
    (rho, predicted)
}

/// Algorithm 4.1: the new radius and whether the trial point `xk + pk` is accepted.
pub fn update_radius(
    fk: f64,
    fk_new: f64,
    dfk: ArrayView1<f64>,
    d2fk: ArrayView2<f64>,
    pk: ArrayView1<f64>,
    delta: f64,
    delta_max: f64,
    eta: f64,
) -> (f64, bool) {
    let (rho, predicted) = reduction_ratio(fk, fk_new, dfk, d2fk, pk);

    let delta_new = if rho < 0.25 || predicted < 0.0 {
        0.25 * delta
    } else if rho > 0.75 && (norm(pk) - delta).abs() < RADIUS_TOL {
        (2.0 * delta).min(delta_max)
    } else {
        delta
    };
    (delta_new, rho > eta && predicted > 0.0)
}

/// Cholesky factor of `B + lambda I`.
fn shifted_factor(b: ArrayView2<f64>, lambda: f64) -> Result<Array2<f64>, NumericalFailure> {
    let shifted = &b + &(Array2::<f64>::eye(b.nrows()) * lambda);
    linalg::cholesky(shifted.view()).ok_or_else(|| {
        NumericalFailure::LinAlg(format!(
            "B + {:e} I is not positive definite in the exact trust region solver",
            lambda
        ))
    })
}

/// Algorithm 4.3: a fixed number of Newton iterations on `lambda`, then the step solved with the
/// final `lambda`.
fn exact(
    g: ArrayView1<f64>,
    b: ArrayView2<f64>,
    delta: f64,
    lambda0: f64,
) -> Result<Array1<f64>, NumericalFailure> {
    let neg_g = -&g;
    let mut lambda = lambda0;

    for _ in 0..EXACT_ITERATIONS {
        let l = shifted_factor(b, lambda)?;
        let pk = linalg::cholesky_solve(l.view(), neg_g.view());
        let pp = pk.dot(&pk);
        if pp == 0.0 {
            return Ok(pk);
        }
        let q = linalg::forward_substitution(l.view(), pk.view());
        let qq = q.dot(&q);
        lambda = (lambda + (pp / qq) * (pp.sqrt() - delta) / delta).max(0.0);
    }
    let l = shifted_factor(b, lambda)?;
    Ok(linalg::cholesky_solve(l.view(), neg_g.view()))
}

/// The dogleg path through the Cauchy point towards the full step `pb = -B^-1 g`.
fn dogleg(
    g: ArrayView1<f64>,
    b: ArrayView2<f64>,
    pb: ArrayView1<f64>,
    delta: f64,
) -> Array1<f64> {
    if norm(pb) <= delta {
        return pb.to_owned();
    }
    let gbg = linalg::quadratic_form(b, g);
    if gbg <= 0.0 {
        return &g * (-delta / norm(g));
    }
    let pu = &g * (-g.dot(&g) / gbg);
    let pu_norm = norm(pu.view());
    if pu_norm >= delta {
        return pu * (delta / pu_norm);
    }

    // |pu + t (pb - pu)| = delta for t in [0, 1]
    let d = &pb - &pu;
    let a = d.dot(&d);
    let half_b = pu.dot(&d);
    let c = pu.dot(&pu) - delta * delta;
    let t = (-half_b + (half_b * half_b - a * c).sqrt()) / a;
    pu + d * t
}

/// Algorithm 4.2.
fn cauchy_point(g: ArrayView1<f64>, b: ArrayView2<f64>, delta: f64) -> Array1<f64> {
    let g_norm = norm(g);
    if g_norm == 0.0 {
        return Array1::zeros(g.len());
    }
    let gbg = linalg::quadratic_form(b, g);
    let tau = if gbg <= 0.0 {
        1.0
    } else {
        (g_norm.powi(3) / (delta * gbg)).min(1.0)
    };
    &g * (-tau * delta / g_norm)
}

/// Subproblem solver and radius state of a trust region run.
#[derive(Debug, Clone)]
pub struct TrustRegion {
    pub solver: TrustRegionSolver,
    pub modifier: HessianMod,
    pub mach_acc: f64,
    pub lambda0: f64,
    /// Acceptance threshold on the reduction ratio.
    pub eta: f64,
    pub state: TrustRegionState,
}

impl TrustRegion {
    pub fn from_config(config: &Configuration) -> Self {
        TrustRegion {
            solver: config.trust_region_solver,
            modifier: config.effective_hessian_mod(),
            mach_acc: config.mach_acc,
            lambda0: config.lambda0,
            eta: config.trust_eta,
            state: TrustRegionState {
                delta: config.delta0,
                delta_max: config.delta_max,
                rho: 0.0,
            },
        }
    }

    /// The trial step for gradient `g` and Hessian `h` within the current radius.
    pub fn step(
        &self,
        g: ArrayView1<f64>,
        h: ArrayView2<f64>,
    ) -> Result<Array1<f64>, NumericalFailure> {
        let modified = hessian_mods::modify(self.modifier, g, h, self.mach_acc)?;
        let delta = self.state.delta;
        Ok(match self.solver {
            TrustRegionSolver::Exact => exact(g, modified.matrix.view(), delta, self.lambda0)?,
            TrustRegionSolver::Dogleg => {
                dogleg(g, modified.matrix.view(), modified.pk.view(), delta)
            }
            TrustRegionSolver::CauchyPoint => cauchy_point(g, modified.matrix.view(), delta),
        })
    }

    /// Updates the radius after trying `pk` and reports whether the trial point is accepted.
    pub fn update(
        &mut self,
        fk: f64,
        fk_new: f64,
        g: ArrayView1<f64>,
        h: ArrayView2<f64>,
        pk: ArrayView1<f64>,
    ) -> Result<bool, NumericalFailure> {
        let (rho, _) = reduction_ratio(fk, fk_new, g, h, pk);
        let (delta, accept) = update_radius(
            fk,
            fk_new,
            g,
            h,
            pk,
            self.state.delta,
            self.state.delta_max,
            self.eta,
        );
        if !(delta > 0.0) {
            return Err(NumericalFailure::TrustRegion(
                "the trust region radius has shrunk to zero".to_string(),
            ));
        }
        if delta != self.state.delta {
            debug!(
                "trust region radius {:e} -> {:e} (rho = {:e})",
                self.state.delta, delta, rho
            );
        }
        self.state.delta = delta;
        self.state.rho = rho;
        Ok(accept)
    }
}
