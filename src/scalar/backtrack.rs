//! Armijo backtracking (Nocedal and Wright, Algorithm 3.1): start from the initial step and halve
//! it until the sufficient decrease condition holds.
use super::{LineFunction, LineSearchParams};
use crate::error::NumericalFailure;

const CONTRACTION: f64 = 0.5;

pub fn backtrack<L: LineFunction>(
    phi: &mut L,
    f0: f64,
    d0: f64,
    params: &LineSearchParams,
) -> Result<f64, NumericalFailure> {
    let mut alpha = params.a0;
    for _ in 0..params.max_trials {
        if phi.value(alpha) <= f0 + params.mu * alpha * d0 {
            return Ok(alpha);
        }
        alpha *= CONTRACTION;
    }
    Err(NumericalFailure::LineSearch(format!(
        "no sufficient decrease after {} backtracking steps",
        params.max_trials
    )))
}
