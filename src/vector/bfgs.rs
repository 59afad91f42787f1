//! BFGS quasi-Newton method (Nocedal and Wright, Algorithm 6.1).
//!
//! The inverse Hessian approximation starts as the identity, is rescaled by `y^T s / y^T y`
//! before the first update (eq. 6.20) and is then updated with
//!
//! `H+ = (I - r s y^T) H (I - r y s^T) + r s s^T`, `r = 1 / y^T s`.
//!
//! Updates with `y^T s <= 0` would destroy positive definiteness and are skipped.
use log::debug;
use ndarray::prelude::*;

use super::DirectionStrategy;
use crate::error::NumericalFailure;
use crate::minimizer::IterateState;
use crate::utils::all_finite;

#[derive(Debug, Clone, Default)]
pub struct Bfgs {
    /// The current inverse Hessian approximation, the identity until the first update.
    pub inv_hessian: Option<Array2<f64>>,
}

impl Bfgs {
    pub fn new() -> Self {
        Bfgs { inv_hessian: None }
    }
}

impl DirectionStrategy for Bfgs {
    fn direction(&mut self, state: &IterateState) -> Result<Array1<f64>, NumericalFailure> {
        Ok(match self.inv_hessian {
            Some(ref h) => -h.dot(&state.g),
            None => -&state.g,
        })
    }

    fn update(
        &mut self,
        old: &IterateState,
        new: &IterateState,
        _pk: ArrayView1<f64>,
    ) -> Result<(), NumericalFailure> {
        let s = &new.x - &old.x;
        let y = &new.g - &old.g;
        let ys = y.dot(&s);
        if !(ys > 0.0) {
            debug!("BFGS update skipped, curvature y^T s = {:e}", ys);
            return Ok(());
        }
        let n = s.len();
        let h = match self.inv_hessian.take() {
            Some(h) => h,
            None => Array2::<f64>::eye(n) * (ys / y.dot(&y)),
        };

        let r = 1.0 / ys;
        let hy = h.dot(&y);
        let yhy = y.dot(&hy);
        let mut updated = h;
        for i in 0..n {
            for j in 0..n {
                updated[[i, j]] += -r * (s[i] * hy[j] + hy[i] * s[j]) + (r * r * yhy + r) * s[i] * s[j];
            }
        }
        if !all_finite(updated.view()) {
            return Err(NumericalFailure::Overflow(
                "non-finite BFGS inverse Hessian".to_string(),
            ));
        }
        self.inv_hessian = Some(updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::AbsDiffEq;

    fn state(x: &[f64], g: &[f64]) -> IterateState {
        IterateState {
            x: arr1(x),
            f: 0.0,
            g: arr1(g),
            h: None,
        }
    }

    #[test]
    fn secant_condition() {
        // f(x) = x^T A x / 2
        let a = arr2(&[[3.0, 1.0], [1.0, 2.0]]);
        let old = state(&[1.0, 1.0], &[4.0, 3.0]);
        let x_new = arr1(&[0.5, -0.25]);
        let new = IterateState {
            g: a.dot(&x_new),
            x: x_new,
            f: 0.0,
            h: None,
        };
        let mut bfgs = Bfgs::new();
        assert_eq!(bfgs.direction(&old).unwrap(), arr1(&[-4.0, -3.0]));
        bfgs.update(&old, &new, arr1(&[0.0, 0.0]).view()).unwrap();

        let h = bfgs.inv_hessian.clone().unwrap();
        let s = &new.x - &old.x;
        let y = &new.g - &old.g;
        assert!(h.dot(&y).abs_diff_eq(&s, 1e-12));
        assert!(h.abs_diff_eq(&h.t(), 1e-12));
        assert!(bfgs.direction(&new).unwrap().dot(&new.g) < 0.0);
    }

    #[test]
    fn skips_negative_curvature() {
        let old = state(&[0.0], &[1.0]);
        let new = state(&[1.0], &[0.5]);
        let mut bfgs = Bfgs::new();
        bfgs.update(&old, &new, arr1(&[1.0]).view()).unwrap();
        assert!(bfgs.inv_hessian.is_none());
    }
}
