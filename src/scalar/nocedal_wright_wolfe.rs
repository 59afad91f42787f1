//! Strong Wolfe line search of Nocedal and Wright (Algorithms 3.5 and 3.6).
//!
//! The trial step is doubled, up to `4 max(1, a0)`, until it either satisfies the strong Wolfe
//! conditions or brackets an acceptable step, which is then narrowed down by `zoom` using
//! safeguarded cubic interpolation.
use super::interpolate;
use super::{LineFunction, LineSearchParams};
use crate::error::NumericalFailure;

/// Interpolated steps closer than this fraction of the bracket width to either end are replaced
/// by bisection.
const MARGIN: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
struct Sample {
    a: f64,
    f: f64,
    d: f64,
}

pub fn nocedal_wright_wolfe<L: LineFunction>(
    phi: &mut L,
    f0: f64,
    d0: f64,
    params: &LineSearchParams,
) -> Result<f64, NumericalFailure> {
    let a_max = 4.0 * params.a0.max(1.0);
    let mut prev = Sample { a: 0.0, f: f0, d: d0 };
    let mut alpha = params.a0;

    for i in 0..params.max_trials {
        let (f, d) = phi.value_and_slope(alpha)?;
        let cur = Sample { a: alpha, f, d };
        // the zoom phase only gets the evaluations the bracketing phase left over
        let left = params.max_trials - i - 1;
        if f > f0 + params.mu * alpha * d0 || (i > 0 && f >= prev.f) {
            return zoom(phi, f0, d0, prev, cur, params, left);
        }
        if d.abs() <= -params.eta * d0 {
            return Ok(alpha);
        }
        if d >= 0.0 {
            return zoom(phi, f0, d0, cur, prev, params, left);
        }
        if alpha >= a_max {
            return Ok(alpha);
        }
        prev = cur;
        alpha = (2.0 * alpha).min(a_max);
    }
    Err(NumericalFailure::LineSearch(
        "no bracketing step found within the trial limit".to_string(),
    ))
}

/// Narrows the bracket between `lo`, the best point satisfying sufficient decrease, and `hi`,
/// using at most `trials` evaluations.
fn zoom<L: LineFunction>(
    phi: &mut L,
    f0: f64,
    d0: f64,
    mut lo: Sample,
    mut hi: Sample,
    params: &LineSearchParams,
    trials: usize,
) -> Result<f64, NumericalFailure> {
    for _ in 0..trials {
        let left = lo.a.min(hi.a);
        let right = lo.a.max(hi.a);
        let width = right - left;
        let a = match interpolate::cubic_hermite(lo.a, lo.f, lo.d, hi.a, hi.f, hi.d) {
            Some(a) if a.is_finite() && a >= left + MARGIN * width && a <= right - MARGIN * width => a,
            _ => 0.5 * (lo.a + hi.a),
        };
        let (f, d) = phi.value_and_slope(a)?;
        let cur = Sample { a, f, d };
        if f > f0 + params.mu * a * d0 || f >= lo.f {
            hi = cur;
        } else {
            if d.abs() <= -params.eta * d0 {
                return Ok(a);
            }
            if d * (hi.a - lo.a) >= 0.0 {
                hi = lo;
            }
            lo = cur;
        }
        if (hi.a - lo.a).abs() <= std::f64::EPSILON * lo.a.abs().max(1.0) {
            break;
        }
    }
    // the bracket collapsed or the budget ran out, fall back to the best point with sufficient decrease
    if lo.a > 0.0 {
        Ok(lo.a)
    } else {
        Err(NumericalFailure::LineSearch(
            "the Wolfe zoom ended without an acceptable step".to_string(),
        ))
    }
}
