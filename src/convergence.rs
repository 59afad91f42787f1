//! Termination tests applied after every accepted step.
use ndarray::prelude::*;

use crate::error::ConfigError;

/// Stateless stopping rule over successive function values and the new gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvergenceTest {
    /// `|f_new - f_old| <= func_tol`.
    FuncOnly { func_tol: f64 },
    /// `||g_new|| <= grad_tol`, or no change at all in the function value. The second condition
    /// stops quasi-Newton methods that stagnate on a flat step.
    GradOnly { grad_tol: f64 },
    /// Either of the two conditions is sufficient.
    Both { func_tol: f64, grad_tol: f64 },
}

impl ConvergenceTest {
    pub fn from_tolerances(
        func_tol: Option<f64>,
        grad_tol: Option<f64>,
    ) -> Result<Self, ConfigError> {
        match (func_tol, grad_tol) {
            (Some(func_tol), Some(grad_tol)) => Ok(ConvergenceTest::Both { func_tol, grad_tol }),
            (Some(func_tol), None) => Ok(ConvergenceTest::FuncOnly { func_tol }),
            (None, Some(grad_tol)) => Ok(ConvergenceTest::GradOnly { grad_tol }),
            (None, None) => Err(ConfigError::NoTolerance),
        }
    }

    pub fn should_stop(&self, f_new: f64, f_old: f64, g_new: ArrayView1<f64>) -> bool {
        match *self {
            ConvergenceTest::FuncOnly { func_tol } => (f_new - f_old).abs() <= func_tol,
            ConvergenceTest::GradOnly { grad_tol } => {
                f_new - f_old == 0.0 || g_new.dot(&g_new).sqrt() <= grad_tol
            }
            ConvergenceTest::Both { func_tol, grad_tol } => {
                (f_new - f_old).abs() <= func_tol || g_new.dot(&g_new).sqrt() <= grad_tol
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_only() {
        let test = ConvergenceTest::from_tolerances(Some(1e-10), None).unwrap();
        let g = arr1(&[100.0, 100.0]);
        assert!(test.should_stop(1.0, 1.0 + 1e-11, g.view()));
        assert!(!test.should_stop(1.0, 1.0 + 1e-9, g.view()));
    }

    #[test]
    fn grad_only() {
        let test = ConvergenceTest::GradOnly { grad_tol: 1e-6 };
        assert!(test.should_stop(3.0, 4.0, arr1(&[3e-7, 4e-7]).view()));
        assert!(!test.should_stop(3.0, 4.0, arr1(&[3e-6, 4e-6]).view()));
        // exactly flat steps always stop
        assert!(test.should_stop(4.0, 4.0, arr1(&[1.0, 1.0]).view()));
    }

    #[test]
    fn both() {
        let test = ConvergenceTest::from_tolerances(Some(1e-10), Some(1e-6)).unwrap();
        assert!(test.should_stop(1.0, 2.0, arr1(&[0.0]).view()));
        assert!(test.should_stop(1.0, 1.0, arr1(&[1.0]).view()));
        assert!(!test.should_stop(1.0, 2.0, arr1(&[1.0]).view()));
    }

    #[test]
    fn no_tolerance() {
        assert_eq!(
            ConvergenceTest::from_tolerances(None, None),
            Err(ConfigError::NoTolerance)
        );
    }
}
