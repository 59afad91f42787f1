//! Nonlinear conjugate gradient method (Nocedal and Wright, chapter 5.2).
//!
//! `p_k+1 = -g_k+1 + beta p_k` with the configured beta formula. The method is restarted with
//! `beta = 0` whenever successive gradients are far from orthogonal,
//! `|g_k+1 . g_k| / |g_k+1|^2 >= 0.1` (eq. 5.52), and the steepest descent direction replaces any
//! direction that does not descend.
use log::debug;
use ndarray::prelude::*;

use super::DirectionStrategy;
use crate::config::CgFormula;
use crate::error::NumericalFailure;
use crate::minimizer::IterateState;

const RESTART: f64 = 0.1;

/// A direction together with the squared norm of the gradient it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDirection {
    pub pk: Array1<f64>,
    pub dot_g: f64,
}

/// The beta coefficient. Zero denominators give `beta = 0`.
pub fn beta(
    formula: CgFormula,
    gk: ArrayView1<f64>,
    gk_new: ArrayView1<f64>,
    pk: ArrayView1<f64>,
    dot_gk: f64,
) -> f64 {
    let ratio = |num: f64, den: f64| if den == 0.0 { 0.0 } else { num / den };
    match formula {
        CgFormula::FletcherReeves => ratio(gk_new.dot(&gk_new), dot_gk),
        CgFormula::PolakRibiere => ratio(gk_new.dot(&(&gk_new - &gk)), dot_gk),
        CgFormula::PolakRibierePlus => ratio(gk_new.dot(&(&gk_new - &gk)), dot_gk).max(0.0),
        CgFormula::HestenesStiefel => {
            let y = &gk_new - &gk;
            ratio(gk_new.dot(&y), y.dot(&pk))
        }
    }
}

/// The direction following `pk` once the gradient has moved from `gk` to `gk_new`.
pub fn next_direction(
    formula: CgFormula,
    gk: ArrayView1<f64>,
    gk_new: ArrayView1<f64>,
    pk: ArrayView1<f64>,
    dot_gk: f64,
) -> Array1<f64> {
    let dot_new = gk_new.dot(&gk_new);
    let restart = dot_new == 0.0 || gk_new.dot(&gk).abs() / dot_new >= RESTART;
    let b = if restart {
        0.0
    } else {
        beta(formula, gk, gk_new, pk, dot_gk)
    };

    let p = &pk * b - &gk_new;
    if p.dot(&gk_new) >= 0.0 {
        debug!("conjugate gradient direction is not a descent direction, restarting");
        return -&gk_new;
    }
    p
}

#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    pub formula: CgFormula,
    next: Option<SearchDirection>,
}

impl ConjugateGradient {
    pub fn new(formula: CgFormula) -> Self {
        ConjugateGradient {
            formula,
            next: None,
        }
    }
}

impl DirectionStrategy for ConjugateGradient {
    fn direction(&mut self, state: &IterateState) -> Result<Array1<f64>, NumericalFailure> {
        Ok(match self.next {
            Some(ref dir) => dir.pk.clone(),
            None => -&state.g,
        })
    }

    fn update(
        &mut self,
        old: &IterateState,
        new: &IterateState,
        pk: ArrayView1<f64>,
    ) -> Result<(), NumericalFailure> {
        let dot_gk = match self.next {
            Some(ref dir) => dir.dot_g,
            None => old.g.dot(&old.g),
        };
        let p = next_direction(self.formula, old.g.view(), new.g.view(), pk, dot_gk);
        self.next = Some(SearchDirection {
            pk: p,
            dot_g: new.g.dot(&new.g),
        });
        Ok(())
    }
}
