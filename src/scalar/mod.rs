//! One dimensional step length searches along a descent direction.
//!
//! Every search works on a `LineFunction`, the restriction `phi(a) = f(xk + a pk)` of the
//! objective to the ray spanned by the search direction, and returns the accepted step length
//! together with the number of function and gradient evaluations it spent.

mod backtrack;
mod interpolate;
mod more_thuente;
mod nocedal_wright_interpol;
mod nocedal_wright_wolfe;

pub use self::backtrack::backtrack;
pub use self::more_thuente::more_thuente;
pub use self::nocedal_wright_interpol::nocedal_wright_interpol;
pub use self::nocedal_wright_wolfe::nocedal_wright_wolfe;

use ndarray::prelude::*;

use crate::config::{Configuration, LineSearchAlgorithm};
use crate::error::NumericalFailure;
use crate::utils::Evaluator;

/// The objective restricted to a line.
pub trait LineFunction {
    /// `phi(alpha)`.
    fn value(&mut self, alpha: f64) -> f64;

    /// `phi(alpha)` and the directional derivative `phi'(alpha)`.
    fn value_and_slope(&mut self, alpha: f64) -> Result<(f64, f64), NumericalFailure>;
}

/// A pair of closures `(phi, dphi)`.
impl<F, G> LineFunction for (F, G)
where
    F: Fn(f64) -> f64,
    G: Fn(f64) -> f64,
{
    fn value(&mut self, alpha: f64) -> f64 {
        (self.0)(alpha)
    }

    fn value_and_slope(&mut self, alpha: f64) -> Result<(f64, f64), NumericalFailure> {
        Ok(((self.0)(alpha), (self.1)(alpha)))
    }
}

/// `phi(a) = f(xk + a pk)` evaluated through the counting `Evaluator`.
pub struct Ray<'e, 'a> {
    eval: &'e mut Evaluator<'a>,
    xk: ArrayView1<'e, f64>,
    pk: ArrayView1<'e, f64>,
}

impl<'e, 'a> Ray<'e, 'a> {
    pub fn new(eval: &'e mut Evaluator<'a>, xk: ArrayView1<'e, f64>, pk: ArrayView1<'e, f64>) -> Self {
        Ray { eval, xk, pk }
    }

    fn point(&self, alpha: f64) -> Array1<f64> {
        &self.xk + &(&self.pk * alpha)
    }
}

impl<'e, 'a> LineFunction for Ray<'e, 'a> {
    fn value(&mut self, alpha: f64) -> f64 {
        let x = self.point(alpha);
        self.eval.func(x.view())
    }

    fn value_and_slope(&mut self, alpha: f64) -> Result<(f64, f64), NumericalFailure> {
        let x = self.point(alpha);
        let f = self.eval.func(x.view());
        let g = self.eval.dfunc(x.view())?;
        Ok((f, g.dot(&self.pk)))
    }
}

/// Counts the evaluations of a single search. NaN values are reported as `+inf` so that every
/// comparison against the sufficient decrease bound rejects them.
struct Counted<'l, L> {
    inner: &'l mut L,
    f_count: usize,
    g_count: usize,
}

fn sanitise(f: f64) -> f64 {
    if f.is_nan() {
        std::f64::INFINITY
    } else {
        f
    }
}

impl<'l, L: LineFunction> LineFunction for Counted<'l, L> {
    fn value(&mut self, alpha: f64) -> f64 {
        self.f_count += 1;
        sanitise(self.inner.value(alpha))
    }

    fn value_and_slope(&mut self, alpha: f64) -> Result<(f64, f64), NumericalFailure> {
        self.f_count += 1;
        self.g_count += 1;
        let (f, d) = self.inner.value_and_slope(alpha)?;
        Ok((sanitise(f), d))
    }
}

/// Constants shared by all line searches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchParams {
    /// Initial step length.
    pub a0: f64,
    /// Sufficient decrease constant.
    pub mu: f64,
    /// Curvature constant of the Wolfe conditions.
    pub eta: f64,
    /// Upper bound on the evaluations of one search.
    pub max_trials: usize,
}

impl LineSearchParams {
    pub fn from_config(config: &Configuration) -> Self {
        LineSearchParams {
            a0: config.a0,
            mu: config.mu,
            eta: config.effective_eta(),
            max_trials: 100,
        }
    }
}

impl Default for LineSearchParams {
    fn default() -> Self {
        LineSearchParams {
            a0: 1.0,
            mu: 1e-4,
            eta: 0.9,
            max_trials: 100,
        }
    }
}

/// Accepted step length and the evaluations spent finding it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub alpha: f64,
    pub f_count: usize,
    pub g_count: usize,
}

/// Runs `algorithm` on `phi`, where `f0 = phi(0)` and `d0 = phi'(0)`.
///
/// Every search but `NoSearch` requires `d0 < 0`.
pub fn search<L: LineFunction>(
    algorithm: LineSearchAlgorithm,
    phi: &mut L,
    f0: f64,
    d0: f64,
    params: &LineSearchParams,
) -> Result<StepResult, NumericalFailure> {
    let mut counted = Counted {
        inner: phi,
        f_count: 0,
        g_count: 0,
    };
    let alpha = match algorithm {
        LineSearchAlgorithm::NoSearch => params.a0,
        _ if !(d0 < 0.0) => {
            return Err(NumericalFailure::LineSearch(
                "The search direction is not a descent direction".to_string(),
            ))
        }
        LineSearchAlgorithm::Backtrack => backtrack(&mut counted, f0, d0, params)?,
        LineSearchAlgorithm::NocedalWrightInterpol => {
            nocedal_wright_interpol(&mut counted, f0, d0, params)?
        }
        LineSearchAlgorithm::NocedalWrightWolfe => {
            nocedal_wright_wolfe(&mut counted, f0, d0, params)?
        }
        LineSearchAlgorithm::MoreThuente => more_thuente(&mut counted, f0, d0, params)?,
    };
    Ok(StepResult {
        alpha,
        f_count: counted.f_count,
        g_count: counted.g_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_search_takes_initial_step() {
        let mut phi = (|a: f64| a, |_: f64| 1.0);
        let params = LineSearchParams {
            a0: 0.5,
            ..LineSearchParams::default()
        };
        // the slope is not checked either
        let step = search(LineSearchAlgorithm::NoSearch, &mut phi, 0.0, 1.0, &params).unwrap();
        assert_eq!(
            step,
            StepResult {
                alpha: 0.5,
                f_count: 0,
                g_count: 0
            }
        );
    }

    #[test]
    fn rejects_ascent_direction() {
        let mut phi = (|a: f64| a, |_: f64| 1.0);
        for &algorithm in &[
            LineSearchAlgorithm::Backtrack,
            LineSearchAlgorithm::NocedalWrightInterpol,
            LineSearchAlgorithm::NocedalWrightWolfe,
            LineSearchAlgorithm::MoreThuente,
        ] {
            let res = search(algorithm, &mut phi, 0.0, 1.0, &LineSearchParams::default());
            assert!(res.is_err(), "{} accepted an ascent direction", algorithm);
        }
    }

    #[test]
    fn ray_counts_through_evaluator() {
        let f = |x: ArrayView1<f64>| (x[0] - 3.0).powi(2);
        let g = |x: ArrayView1<f64>| arr1(&[2.0 * (x[0] - 3.0)]);
        let mut eval = Evaluator::new(&f, &g, None);
        let x0 = arr1(&[0.0]);
        let p = arr1(&[1.0]);
        let step = {
            let mut ray = Ray::new(&mut eval, x0.view(), p.view());
            search(
                LineSearchAlgorithm::MoreThuente,
                &mut ray,
                9.0,
                -6.0,
                &LineSearchParams::default(),
            )
            .unwrap()
        };
        assert_eq!(step.f_count, eval.f_count);
        assert_eq!(step.g_count, eval.g_count);
        assert!(step.f_count >= 1);
    }

    #[test]
    fn wolfe_searches_satisfy_strong_wolfe() {
        // phi(a) = (a - 2)^2 - 4 + a^4 / 50
        let phi = |a: f64| (a - 2.0).powi(2) - 4.0 + a.powi(4) / 50.0;
        let dphi = |a: f64| 2.0 * (a - 2.0) + 4.0 * a.powi(3) / 50.0;
        let (f0, d0) = (phi(0.0), dphi(0.0));
        for &eta in &[0.9, 0.1] {
            let params = LineSearchParams {
                eta,
                ..LineSearchParams::default()
            };
            for &algorithm in &[
                LineSearchAlgorithm::NocedalWrightWolfe,
                LineSearchAlgorithm::MoreThuente,
            ] {
                let mut line = (phi, dphi);
                let step = search(algorithm, &mut line, f0, d0, &params).unwrap();
                let a = step.alpha;
                println!("{} eta {}: alpha {} after {} trials", algorithm, eta, a, step.f_count);
                assert!(phi(a) <= f0 + params.mu * a * d0);
                assert!(dphi(a).abs() <= eta * d0.abs());
                assert_eq!(step.f_count, step.g_count);
            }
        }
    }
}
