use ndarray::prelude::*;

use super::DirectionStrategy;
use crate::error::NumericalFailure;
use crate::minimizer::IterateState;

/// `pk = -gk`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteepestDescent;

impl DirectionStrategy for SteepestDescent {
    fn direction(&mut self, state: &IterateState) -> Result<Array1<f64>, NumericalFailure> {
        Ok(-&state.g)
    }
}
