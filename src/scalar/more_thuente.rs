//! Moré and Thuente line search.
//!
//! J. J. Moré and D. J. Thuente. Line search algorithms with guaranteed sufficient decrease.
//! ACM Transactions on Mathematical Software 20 (1994), 286-307.
//!
//! A port of the MINPACK-2 routines `dcsrch` and `dcstep`. The search keeps an interval of
//! uncertainty `[stx, sty]` and chooses new trial steps by safeguarded cubic or quadratic
//! interpolation until the strong Wolfe conditions hold.
use super::{LineFunction, LineSearchParams};
use crate::error::NumericalFailure;

/// Relative width of the interval of uncertainty at which the search gives up refining.
const XTOL: f64 = 1e-10;
const XTRAPL: f64 = 1.1;
const XTRAPU: f64 = 4.0;

/// A step length with its function value and derivative.
#[derive(Debug, Clone, Copy)]
struct Point {
    stp: f64,
    f: f64,
    d: f64,
}

impl Point {
    /// The same point of the auxiliary function `psi(a) = phi(a) - phi(0) - mu a phi'(0)`, up to
    /// the constant.
    fn shifted(self, gtest: f64) -> Point {
        Point {
            stp: self.stp,
            f: self.f - self.stp * gtest,
            d: self.d - gtest,
        }
    }

    fn unshifted(self, gtest: f64) -> Point {
        Point {
            stp: self.stp,
            f: self.f + self.stp * gtest,
            d: self.d + gtest,
        }
    }
}

pub fn more_thuente<L: LineFunction>(
    phi: &mut L,
    f0: f64,
    d0: f64,
    params: &LineSearchParams,
) -> Result<f64, NumericalFailure> {
    let stpmin = 0.0;
    let stpmax = 4.0 * params.a0.max(1.0);
    let gtest = params.mu * d0;

    let mut stp = params.a0.min(stpmax);
    let mut brackt = false;
    let mut stage_one = true;
    let mut width = stpmax - stpmin;
    let mut width1 = 2.0 * width;

    let mut x = Point { stp: 0.0, f: f0, d: d0 };
    let mut y = x;
    let mut stmin = 0.0;
    let mut stmax = stp + XTRAPU * stp;

    for _ in 0..params.max_trials {
        let (f, g) = phi.value_and_slope(stp)?;
        let ftest = f0 + stp * gtest;
        if stage_one && f <= ftest && g >= 0.0 {
            stage_one = false;
        }

        // rounding errors or the interval of uncertainty prevent further progress
        if brackt && (stp <= stmin || stp >= stmax) {
            return Ok(stp);
        }
        if brackt && stmax - stmin <= XTOL * stmax {
            return Ok(stp);
        }
        if stp == stpmax && f <= ftest && g <= gtest {
            return Ok(stp);
        }
        if stp == stpmin && (f > ftest || g >= gtest) {
            return Ok(stp);
        }
        if f <= ftest && g.abs() <= -params.eta * d0 {
            return Ok(stp);
        }

        let p = Point { stp, f, d: g };
        if stage_one && f <= x.f && f > ftest {
            // the modified function is used until a step with sufficient decrease and
            // non-negative slope has been found
            let mut xm = x.shifted(gtest);
            let mut ym = y.shifted(gtest);
            stp = dcstep(&mut xm, &mut ym, p.shifted(gtest), &mut brackt, stmin, stmax);
            x = xm.unshifted(gtest);
            y = ym.unshifted(gtest);
        } else {
            stp = dcstep(&mut x, &mut y, p, &mut brackt, stmin, stmax);
        }

        if brackt {
            if (y.stp - x.stp).abs() >= 0.66 * width1 {
                stp = x.stp + 0.5 * (y.stp - x.stp);
            }
            width1 = width;
            width = (y.stp - x.stp).abs();
            stmin = x.stp.min(y.stp);
            stmax = x.stp.max(y.stp);
        } else {
            stmin = stp + XTRAPL * (stp - x.stp);
            stmax = stp + XTRAPU * (stp - x.stp);
        }

        stp = stp.max(stpmin).min(stpmax);

        // fall back to the best step so far if no progress is possible
        if brackt && (stp <= stmin || stp >= stmax || stmax - stmin <= XTOL * stmax) {
            stp = x.stp;
        }
    }
    Err(NumericalFailure::LineSearch(format!(
        "More-Thuente search did not converge within {} evaluations",
        params.max_trials
    )))
}

fn cubic_gamma(theta: f64, s: f64, da: f64, db: f64) -> f64 {
    s * ((theta / s).powi(2) - (da / s) * (db / s)).max(0.0).sqrt()
}

/// Computes a safeguarded step and updates the interval of uncertainty.
///
/// `x` is the endpoint with the lowest function value so far, `y` the other endpoint and `p` the
/// current trial. Returns the next trial step.
fn dcstep(x: &mut Point, y: &mut Point, p: Point, brackt: &mut bool, stpmin: f64, stpmax: f64) -> f64 {
    let sgnd = p.d * x.d.signum();
    let stpf;

    if p.f > x.f {
        // higher function value: the minimum is bracketed
        let theta = 3.0 * (x.f - p.f) / (p.stp - x.stp) + x.d + p.d;
        let s = theta.abs().max(x.d.abs()).max(p.d.abs());
        let mut gamma = cubic_gamma(theta, s, x.d, p.d);
        if p.stp < x.stp {
            gamma = -gamma;
        }
        let pp = (gamma - x.d) + theta;
        let q = ((gamma - x.d) + gamma) + p.d;
        let stpc = x.stp + (pp / q) * (p.stp - x.stp);
        let stpq = x.stp + ((x.d / ((x.f - p.f) / (p.stp - x.stp) + x.d)) / 2.0) * (p.stp - x.stp);
        stpf = if (stpc - x.stp).abs() < (stpq - x.stp).abs() {
            stpc
        } else {
            stpc + (stpq - stpc) / 2.0
        };
        *brackt = true;
    } else if sgnd < 0.0 {
        // derivatives of opposite sign: the minimum is bracketed
        let theta = 3.0 * (x.f - p.f) / (p.stp - x.stp) + x.d + p.d;
        let s = theta.abs().max(x.d.abs()).max(p.d.abs());
        let mut gamma = cubic_gamma(theta, s, x.d, p.d);
        if p.stp > x.stp {
            gamma = -gamma;
        }
        let pp = (gamma - p.d) + theta;
        let q = ((gamma - p.d) + gamma) + x.d;
        let stpc = p.stp + (pp / q) * (x.stp - p.stp);
        let stpq = p.stp + (p.d / (p.d - x.d)) * (x.stp - p.stp);
        stpf = if (stpc - p.stp).abs() > (stpq - p.stp).abs() {
            stpc
        } else {
            stpq
        };
        *brackt = true;
    } else if p.d.abs() < x.d.abs() {
        // same sign, decreasing magnitude of the derivative
        let theta = 3.0 * (x.f - p.f) / (p.stp - x.stp) + x.d + p.d;
        let s = theta.abs().max(x.d.abs()).max(p.d.abs());
        let mut gamma = cubic_gamma(theta, s, x.d, p.d);
        if p.stp > x.stp {
            gamma = -gamma;
        }
        let pp = (gamma - p.d) + theta;
        let q = (gamma + (x.d - p.d)) + gamma;
        let r = pp / q;
        let stpc = if r < 0.0 && gamma != 0.0 {
            p.stp + r * (x.stp - p.stp)
        } else if p.stp > x.stp {
            stpmax
        } else {
            stpmin
        };
        let stpq = p.stp + (p.d / (p.d - x.d)) * (x.stp - p.stp);
        if *brackt {
            let s = if (stpc - p.stp).abs() < (stpq - p.stp).abs() {
                stpc
            } else {
                stpq
            };
            let limit = p.stp + 0.66 * (y.stp - p.stp);
            stpf = if p.stp > x.stp { limit.min(s) } else { limit.max(s) };
        } else {
            let s = if (stpc - p.stp).abs() > (stpq - p.stp).abs() {
                stpc
            } else {
                stpq
            };
            stpf = s.min(stpmax).max(stpmin);
        }
    } else if *brackt {
        // same sign, the derivative does not decrease
        let theta = 3.0 * (p.f - y.f) / (y.stp - p.stp) + y.d + p.d;
        let s = theta.abs().max(y.d.abs()).max(p.d.abs());
        let mut gamma = cubic_gamma(theta, s, y.d, p.d);
        if p.stp > y.stp {
            gamma = -gamma;
        }
        let pp = (gamma - p.d) + theta;
        let q = ((gamma - p.d) + gamma) + y.d;
        stpf = p.stp + (pp / q) * (y.stp - p.stp);
    } else if p.stp > x.stp {
        stpf = stpmax;
    } else {
        stpf = stpmin;
    }

    if p.f > x.f {
        *y = p;
    } else {
        if sgnd < 0.0 {
            *y = *x;
        }
        *x = p;
    }
    stpf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimises_along_quadratic() {
        let phi = |a: f64| (a - 0.3).powi(2);
        let dphi = |a: f64| 2.0 * (a - 0.3);
        let mut line = (phi, dphi);
        let params = LineSearchParams {
            eta: 0.1,
            ..LineSearchParams::default()
        };
        let alpha = more_thuente(&mut line, phi(0.0), dphi(0.0), &params).unwrap();
        println!("alpha: {}", alpha);
        assert!(dphi(alpha).abs() <= 0.1 * 0.6);
    }

    #[test]
    fn extrapolates_to_the_step_bound() {
        // decreasing everywhere, the step is capped at 4 max(1, a0)
        let mut line = (|a: f64| -a, |_: f64| -1.0);
        let alpha = more_thuente(&mut line, 0.0, -1.0, &LineSearchParams::default()).unwrap();
        assert_eq!(alpha, 4.0);
    }
}
