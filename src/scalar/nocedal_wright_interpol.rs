//! Interpolating sufficient decrease search (Nocedal and Wright, section 3.5).
//!
//! The first rejected trial is replaced by the minimiser of the quadratic through `phi(0)`,
//! `phi'(0)` and the trial, later ones by the minimiser of the cubic through `phi(0)`, `phi'(0)`
//! and the last two trials. Each new step is kept within `[0.1, 0.5]` times the previous one.
use super::interpolate;
use super::{LineFunction, LineSearchParams};
use crate::error::NumericalFailure;

const LOWER: f64 = 0.1;
const UPPER: f64 = 0.5;

pub fn nocedal_wright_interpol<L: LineFunction>(
    phi: &mut L,
    f0: f64,
    d0: f64,
    params: &LineSearchParams,
) -> Result<f64, NumericalFailure> {
    let armijo = |a: f64, fa: f64| fa <= f0 + params.mu * a * d0;

    let mut alpha = params.a0;
    let mut f_alpha = phi.value(alpha);
    let mut previous: Option<(f64, f64)> = None;

    for _ in 1..params.max_trials {
        if armijo(alpha, f_alpha) {
            return Ok(alpha);
        }
        let trial = match previous {
            None => Some(interpolate::quadratic(f0, d0, alpha, f_alpha)),
            Some((a_prev, f_prev)) => interpolate::cubic(f0, d0, a_prev, f_prev, alpha, f_alpha),
        };
        let next = match trial {
            Some(a) if a.is_finite() => a,
            _ => UPPER * alpha,
        };
        previous = Some((alpha, f_alpha));
        alpha = next.max(LOWER * alpha).min(UPPER * alpha);
        f_alpha = phi.value(alpha);
    }
    if armijo(alpha, f_alpha) {
        return Ok(alpha);
    }
    Err(NumericalFailure::LineSearch(format!(
        "no sufficient decrease after {} interpolation steps",
        params.max_trials
    )))
}
