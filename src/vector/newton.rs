use ndarray::prelude::*;

use super::DirectionStrategy;
use crate::config::HessianMod;
use crate::error::NumericalFailure;
use crate::hessian_mods;
use crate::minimizer::IterateState;

/// Newton direction `-B^-1 g`, where `B` is the Hessian after the configured modification.
#[derive(Debug, Clone)]
pub struct Newton {
    pub modifier: HessianMod,
    pub mach_acc: f64,
}

impl Newton {
    pub fn new(modifier: HessianMod, mach_acc: f64) -> Self {
        Newton { modifier, mach_acc }
    }
}

impl DirectionStrategy for Newton {
    fn direction(&mut self, state: &IterateState) -> Result<Array1<f64>, NumericalFailure> {
        let h = state.h.as_ref().ok_or_else(|| {
            NumericalFailure::Dimension("the Newton direction requires the Hessian".to_string())
        })?;
        let m = hessian_mods::modify(self.modifier, state.g.view(), h.view(), self.mach_acc)?;
        Ok(m.pk)
    }
}
