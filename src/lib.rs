//! Local nonlinear minimisation of smooth objective functions.
//!
//! One iteration loop drives every direction family: steepest descent, Newton with a choice of
//! Hessian modifications, BFGS, nonlinear conjugate gradient and trust region Newton. The line
//! search families pick their step length with one of the searches in `scalar`.
//!
//! ```
//! use minfx::{minimize, ConfigurationBuilder, DirectionFamily, HessianMod, RunStatus};
//! use approx::AbsDiffEq;
//! use ndarray::prelude::*;
//!
//! let rosen = |x: ArrayView1<f64>| 100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2);
//! let rosen_der = |x: ArrayView1<f64>| {
//!     arr1(&[
//!         -400.0 * x[0] * (x[1] - x[0] * x[0]) - 2.0 * (1.0 - x[0]),
//!         200.0 * (x[1] - x[0] * x[0]),
//!     ])
//! };
//! let rosen_hess = |x: ArrayView1<f64>| {
//!     arr2(&[
//!         [1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0, -400.0 * x[0]],
//!         [-400.0 * x[0], 200.0],
//!     ])
//! };
//!
//! let config = ConfigurationBuilder::default()
//!     .family(DirectionFamily::Newton)
//!     .hessian_mod(HessianMod::Gmw)
//!     .grad_tol(1e-8)
//!     .build()
//!     .unwrap();
//! let res = minimize(&rosen, &rosen_der, Some(&rosen_hess), arr1(&[-1.2, 1.0]).view(), &config)
//!     .unwrap();
//! assert_eq!(res.status, RunStatus::Converged);
//! assert!(res.x.abs_diff_eq(&arr1(&[1.0, 1.0]), 1e-6));
//! ```

pub mod config;
pub mod convergence;
pub mod error;
pub mod hessian_mods;
pub mod linalg;
pub mod minimizer;
pub mod scalar;
pub mod utils;
pub mod vector;

pub use crate::config::{
    CgFormula, Configuration, ConfigurationBuilder, DirectionFamily, HessianMod,
    LineSearchAlgorithm, TrustRegionSolver,
};
pub use crate::convergence::ConvergenceTest;
pub use crate::error::{ConfigError, NumericalFailure};
pub use crate::minimizer::{
    minimize, IterateState, IterationController, Minimizer, RunResult, RunStatus,
};
pub use crate::utils::{Gradient, Hessian, Objective};
