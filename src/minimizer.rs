//! This module provides the base framework for all minimizers present in this crate: the iterate
//! and result types, the `Minimizer` trait and the iteration controller that drives every
//! direction family through the same loop.
use log::{debug, trace};
use ndarray::prelude::*;

use crate::config::{Configuration, LineSearchAlgorithm};
use crate::convergence::ConvergenceTest;
use crate::error::{ConfigError, NumericalFailure};
use crate::scalar::{self, LineSearchParams, Ray};
use crate::utils::{all_finite, Evaluator, Gradient, Hessian, Objective};
use crate::vector::{self, DirectionStrategy, TrustRegion};

/// Warning set when the iteration cap ends a run.
pub const MAX_ITER_WARNING: &str = "Maximum number of iterations reached";
/// Warning set for models without parameters.
pub const NO_OPTIMISATION_WARNING: &str = "No optimisation";

const SUMMARY_INTERVAL: usize = 100;

/// An accepted point together with the derivatives evaluated there.
#[derive(Debug, Clone, PartialEq)]
pub struct IterateState {
    pub x: Array1<f64>,
    pub f: f64,
    pub g: Array1<f64>,
    /// Only evaluated by the families that use the Hessian.
    pub h: Option<Array2<f64>>,
}

/// Minimizer states at the end of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The convergence test was satisfied.
    Converged,
    /// The iteration cap was reached first.
    MaxIterExceeded,
    /// A numerical failure ended the run at the last accepted point.
    Failed,
    /// The parameter vector was empty, the objective was evaluated once.
    NoParameters,
}

/// A minimization result, storing the final point and the details of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// The final parameter values.
    pub x: Array1<f64>,
    /// The function value at `x`.
    pub f: f64,
    /// The number of iterations run.
    pub iterations: usize,
    pub f_count: usize,
    pub g_count: usize,
    pub h_count: usize,
    /// Set for every run that did not end on the convergence test.
    pub warning: Option<String>,
    pub status: RunStatus,
}

/// A general minimizer trait.
pub trait Minimizer {
    /// Minimizes `func` starting from `x0`. The Hessian is only required by the Newton and trust
    /// region families.
    ///
    /// Only configuration problems are returned as errors; numerical failures end the run and
    /// are reported through `RunResult::warning`.
    fn minimize<'a>(
        &self,
        func: &'a Objective<'a>,
        dfunc: &'a Gradient<'a>,
        d2func: Option<&'a Hessian<'a>>,
        x0: ArrayView1<f64>,
    ) -> Result<RunResult, ConfigError>;
}

/// Minimizes `func` from `x0` with the algorithms selected in `config`.
///
/// ```
/// use minfx::{minimize, ConfigurationBuilder, DirectionFamily, RunStatus};
/// use ndarray::prelude::*;
///
/// let f = |x: ArrayView1<f64>| x[0] * x[0];
/// let g = |x: ArrayView1<f64>| arr1(&[2.0 * x[0]]);
/// let h = |_: ArrayView1<f64>| arr2(&[[2.0]]);
///
/// let config = ConfigurationBuilder::default()
///     .family(DirectionFamily::Newton)
///     .grad_tol(1e-8)
///     .build()
///     .unwrap();
/// let res = minimize(&f, &g, Some(&h), arr1(&[10.0]).view(), &config).unwrap();
/// assert_eq!(res.status, RunStatus::Converged);
/// assert_eq!(res.iterations, 1);
/// ```
pub fn minimize<'a>(
    func: &'a Objective<'a>,
    dfunc: &'a Gradient<'a>,
    d2func: Option<&'a Hessian<'a>>,
    x0: ArrayView1<f64>,
    config: &Configuration,
) -> Result<RunResult, ConfigError> {
    IterationController::new(config)?.minimize(func, dfunc, d2func, x0)
}

/// Runs the shared iteration loop for one configuration.
#[derive(Debug, Clone)]
pub struct IterationController {
    config: Configuration,
    test: ConvergenceTest,
}

impl IterationController {
    pub fn new(config: &Configuration) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(IterationController {
            config: config.clone(),
            test: config.convergence_test()?,
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    fn hessian(
        &self,
        eval: &mut Evaluator<'_>,
        x: ArrayView1<f64>,
    ) -> Result<Option<Array2<f64>>, NumericalFailure> {
        if self.config.needs_hessian() {
            eval.d2func(x).map(Some)
        } else {
            Ok(None)
        }
    }

    fn run(&self, method: &mut Method, eval: &mut Evaluator<'_>, x0: ArrayView1<f64>) -> Outcome {
        let x = x0.to_owned();
        let f = eval.func(x.view());
        if !f.is_finite() {
            return Outcome::new(x, f, 0, Termination::Failed(NumericalFailure::NonFinite));
        }
        let g = match eval.dfunc(x.view()) {
            Ok(g) => g,
            Err(err) => return Outcome::new(x, f, 0, Termination::Failed(err)),
        };
        let h = match self.hessian(eval, x.view()) {
            Ok(h) => h,
            Err(err) => return Outcome::new(x, f, 0, Termination::Failed(err)),
        };

        let max_iterations = self.config.max_iterations;
        let mut state = IterateState { x, f, g, h };
        let mut k = 0;
        loop {
            if k % SUMMARY_INTERVAL == 0 {
                debug!("k = {:<8} fk = {:e}", k, state.f);
            }
            trace!("k = {}, xk = {}, fk = {:e}", k, state.x, state.f);

            let (mut new, pk) = match method.step(eval, &state) {
                Ok(Step::Accepted { state: new, pk }) => (new, pk),
                Ok(Step::Rejected) => {
                    if k + 1 >= max_iterations {
                        return Outcome::from_state(state, k + 1, Termination::MaxIterations);
                    }
                    k += 1;
                    continue;
                }
                Err(err) => return Outcome::from_state(state, k, Termination::Failed(err)),
            };

            if k + 1 >= max_iterations {
                return Outcome::from_state(new, k + 1, Termination::MaxIterations);
            }
            if self.test.should_stop(new.f, state.f, new.g.view()) {
                return Outcome::from_state(new, k + 1, Termination::Converged);
            }
            if let Err(err) = method.update(&state, &new, pk.view()) {
                return Outcome::from_state(new, k + 1, Termination::Failed(err));
            }
            match self.hessian(eval, new.x.view()) {
                Ok(h) => new.h = h,
                Err(err) => return Outcome::from_state(new, k + 1, Termination::Failed(err)),
            }
            state = new;
            k += 1;
        }
    }
}

impl Minimizer for IterationController {
    fn minimize<'a>(
        &self,
        func: &'a Objective<'a>,
        dfunc: &'a Gradient<'a>,
        d2func: Option<&'a Hessian<'a>>,
        x0: ArrayView1<f64>,
    ) -> Result<RunResult, ConfigError> {
        if self.config.needs_hessian() && d2func.is_none() {
            return Err(ConfigError::MissingHessian(self.config.family));
        }
        let mut eval = Evaluator::new(func, dfunc, d2func);

        if x0.is_empty() {
            let f = eval.func(x0);
            debug!("no parameters to minimise, f = {:e}", f);
            return Ok(RunResult {
                x: x0.to_owned(),
                f,
                iterations: 0,
                f_count: eval.f_count,
                g_count: eval.g_count,
                h_count: eval.h_count,
                warning: Some(NO_OPTIMISATION_WARNING.to_string()),
                status: RunStatus::NoParameters,
            });
        }

        let mut method = Method::new(&self.config);
        let outcome = self.run(&mut method, &mut eval, x0);
        Ok(outcome.into_result(&eval))
    }
}

/// How the next point is found.
enum Method {
    LineSearch {
        strategy: Box<dyn DirectionStrategy>,
        algorithm: LineSearchAlgorithm,
        params: LineSearchParams,
    },
    TrustRegion(TrustRegion),
}

enum Step {
    Accepted { state: IterateState, pk: Array1<f64> },
    /// The trust region step was rejected and the radius shrunk.
    Rejected,
}

fn null_step(state: &IterateState) -> Step {
    Step::Accepted {
        state: state.clone(),
        pk: Array1::zeros(state.x.len()),
    }
}

fn is_zero(v: &Array1<f64>) -> bool {
    v.iter().all(|&e| e == 0.0)
}

impl Method {
    fn new(config: &Configuration) -> Self {
        match (vector::strategy_for(config), config.effective_line_search()) {
            (Some(strategy), Some(algorithm)) => Method::LineSearch {
                strategy,
                algorithm,
                params: LineSearchParams::from_config(config),
            },
            _ => Method::TrustRegion(TrustRegion::from_config(config)),
        }
    }

    fn step(
        &mut self,
        eval: &mut Evaluator<'_>,
        state: &IterateState,
    ) -> Result<Step, NumericalFailure> {
        if is_zero(&state.g) {
            return Ok(null_step(state));
        }
        match self {
            Method::LineSearch {
                strategy,
                algorithm,
                params,
            } => {
                let pk = strategy.direction(state)?;
                if !all_finite(pk.view()) {
                    return Err(NumericalFailure::Overflow(
                        "non-finite search direction".to_string(),
                    ));
                }
                let d0 = state.g.dot(&pk);
                let res = {
                    let mut phi = Ray::new(&mut *eval, state.x.view(), pk.view());
                    scalar::search(*algorithm, &mut phi, state.f, d0, params)?
                };
                trace!(
                    "alpha = {:e} after {} function and {} gradient calls",
                    res.alpha,
                    res.f_count,
                    res.g_count
                );

                let x = &state.x + &(&pk * res.alpha);
                let f = eval.func(x.view());
                if !f.is_finite() {
                    return Err(NumericalFailure::NonFinite);
                }
                let g = eval.dfunc(x.view())?;
                Ok(Step::Accepted {
                    state: IterateState { x, f, g, h: None },
                    pk,
                })
            }
            Method::TrustRegion(tr) => {
                let h = state.h.as_ref().ok_or_else(|| {
                    NumericalFailure::Dimension("the trust region step requires the Hessian".to_string())
                })?;
                let pk = tr.step(state.g.view(), h.view())?;
                if is_zero(&pk) {
                    return Ok(null_step(state));
                }
                let x = &state.x + &pk;
                let f = eval.func(x.view());
                if !tr.update(state.f, f, state.g.view(), h.view(), pk.view())? {
                    trace!("trust region step rejected, f = {:e}", f);
                    return Ok(Step::Rejected);
                }
                if !f.is_finite() {
                    return Err(NumericalFailure::NonFinite);
                }
                let g = eval.dfunc(x.view())?;
                Ok(Step::Accepted {
                    state: IterateState { x, f, g, h: None },
                    pk,
                })
            }
        }
    }

    fn update(
        &mut self,
        old: &IterateState,
        new: &IterateState,
        pk: ArrayView1<f64>,
    ) -> Result<(), NumericalFailure> {
        match self {
            Method::LineSearch { strategy, .. } => strategy.update(old, new, pk),
            Method::TrustRegion(_) => Ok(()),
        }
    }
}

enum Termination {
    Converged,
    MaxIterations,
    Failed(NumericalFailure),
}

struct Outcome {
    x: Array1<f64>,
    f: f64,
    iterations: usize,
    termination: Termination,
}

impl Outcome {
    fn new(x: Array1<f64>, f: f64, iterations: usize, termination: Termination) -> Self {
        Outcome {
            x,
            f,
            iterations,
            termination,
        }
    }

    fn from_state(state: IterateState, iterations: usize, termination: Termination) -> Self {
        Outcome::new(state.x, state.f, iterations, termination)
    }

    fn into_result(self, eval: &Evaluator<'_>) -> RunResult {
        let (warning, status) = match self.termination {
            Termination::Converged => (None, RunStatus::Converged),
            Termination::MaxIterations => {
                (Some(MAX_ITER_WARNING.to_string()), RunStatus::MaxIterExceeded)
            }
            Termination::Failed(err) => (Some(err.to_string()), RunStatus::Failed),
        };
        debug!(
            "minimisation finished after {} iterations ({:?}), fk = {:e}",
            self.iterations, status, self.f
        );
        if let Some(ref w) = warning {
            debug!("{}", w);
        }
        RunResult {
            x: self.x,
            f: self.f,
            iterations: self.iterations,
            f_count: eval.f_count,
            g_count: eval.g_count,
            h_count: eval.h_count,
            warning,
            status,
        }
    }
}
