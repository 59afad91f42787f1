//! Search direction strategies of the multi-dimensional minimisers.
//!
//! The line search families implement `DirectionStrategy`; the trust region family solves its
//! subproblem in `trust_region` and manages its own radius instead.

mod bfgs;
mod conjugate_gradient;
mod newton;
mod steepest_descent;
pub mod trust_region;

pub use self::bfgs::Bfgs;
pub use self::conjugate_gradient::{beta, next_direction, ConjugateGradient, SearchDirection};
pub use self::newton::Newton;
pub use self::steepest_descent::SteepestDescent;
pub use self::trust_region::{update_radius, TrustRegion, TrustRegionState};

use ndarray::prelude::*;

use crate::config::{Configuration, DirectionFamily};
use crate::error::NumericalFailure;
use crate::minimizer::IterateState;

/// Computes the search direction of a line search family and carries whatever state the family
/// keeps between iterations.
pub trait DirectionStrategy {
    /// The search direction at `state`.
    fn direction(&mut self, state: &IterateState) -> Result<Array1<f64>, NumericalFailure>;

    /// Called once the step from `old` to `new` along `pk` has been accepted.
    fn update(
        &mut self,
        _old: &IterateState,
        _new: &IterateState,
        _pk: ArrayView1<f64>,
    ) -> Result<(), NumericalFailure> {
        Ok(())
    }
}

/// The strategy of a line search family, `None` for the trust region family.
pub fn strategy_for(config: &Configuration) -> Option<Box<dyn DirectionStrategy>> {
    match config.family {
        DirectionFamily::SteepestDescent => Some(Box::new(SteepestDescent)),
        DirectionFamily::Newton => Some(Box::new(Newton::new(
            config.effective_hessian_mod(),
            config.mach_acc,
        ))),
        DirectionFamily::Bfgs => Some(Box::new(Bfgs::new())),
        DirectionFamily::ConjugateGradient => {
            Some(Box::new(ConjugateGradient::new(config.cg_formula)))
        }
        DirectionFamily::TrustRegion => None,
    }
}
