use ndarray::prelude::*;

use crate::error::NumericalFailure;

/// Scalar objective function.
pub type Objective<'a> = dyn Fn(ArrayView1<f64>) -> f64 + 'a;
/// Gradient of the objective, same length as its argument.
pub type Gradient<'a> = dyn Fn(ArrayView1<f64>) -> Array1<f64> + 'a;
/// Symmetric Hessian of the objective.
pub type Hessian<'a> = dyn Fn(ArrayView1<f64>) -> Array2<f64> + 'a;

/// Wraps the user functions and counts every call made through it.
pub struct Evaluator<'a> {
    func: &'a Objective<'a>,
    dfunc: &'a Gradient<'a>,
    d2func: Option<&'a Hessian<'a>>,
    pub f_count: usize,
    pub g_count: usize,
    pub h_count: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        func: &'a Objective<'a>,
        dfunc: &'a Gradient<'a>,
        d2func: Option<&'a Hessian<'a>>,
    ) -> Self {
        Evaluator {
            func,
            dfunc,
            d2func,
            f_count: 0,
            g_count: 0,
            h_count: 0,
        }
    }

    pub fn func(&mut self, x: ArrayView1<f64>) -> f64 {
        self.f_count += 1;
        (self.func)(x)
    }

    pub fn dfunc(&mut self, x: ArrayView1<f64>) -> Result<Array1<f64>, NumericalFailure> {
        self.g_count += 1;
        let g = (self.dfunc)(x);
        if g.len() != x.len() {
            return Err(NumericalFailure::Dimension(format!(
                "gradient has {} elements, expected {}",
                g.len(),
                x.len()
            )));
        }
        if !all_finite(g.view()) {
            return Err(NumericalFailure::Overflow("non-finite gradient".to_string()));
        }
        Ok(g)
    }

    pub fn d2func(&mut self, x: ArrayView1<f64>) -> Result<Array2<f64>, NumericalFailure> {
        let d2func = match self.d2func {
            Some(h) => h,
            None => {
                return Err(NumericalFailure::Dimension(
                    "no Hessian function supplied".to_string(),
                ))
            }
        };
        self.h_count += 1;
        let h = d2func(x);
        let n = x.len();
        if h.dim() != (n, n) {
            return Err(NumericalFailure::Dimension(format!(
                "Hessian has shape {:?}, expected ({}, {})",
                h.dim(),
                n,
                n
            )));
        }
        if !all_finite(h.view()) {
            return Err(NumericalFailure::Overflow("non-finite Hessian".to_string()));
        }
        Ok(h)
    }
}

pub fn all_finite<D: Dimension>(a: ArrayView<f64, D>) -> bool {
    a.iter().all(|v| v.is_finite())
}

/// Forward difference approximation of the gradient, handy for checking analytic gradients.
pub fn approx_fprime<F>(xk: ArrayView1<f64>, func: F, epsilon: f64) -> Array1<f64>
where
    F: Fn(ArrayView1<f64>) -> f64,
{
    let f0 = func(xk);
    let mut x = xk.to_owned();
    let mut grad = Array1::<f64>::zeros(xk.len());
    for k in 0..xk.len() {
        x[k] += epsilon;
        grad[k] = (func(x.view()) - f0) / epsilon;
        x[k] = xk[k];
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn counts_calls() {
        let f = |x: ArrayView1<f64>| x.dot(&x);
        let g = |x: ArrayView1<f64>| 2.0 * &x;
        let mut eval = Evaluator::new(&f, &g, None);
        let x = arr1(&[1.0, 2.0]);
        assert_eq!(eval.func(x.view()), 5.0);
        eval.func(x.view());
        let grad = eval.dfunc(x.view()).unwrap();
        assert_eq!(grad, arr1(&[2.0, 4.0]));
        assert_eq!((eval.f_count, eval.g_count, eval.h_count), (2, 1, 0));
        assert!(eval.d2func(x.view()).is_err());
        assert_eq!(eval.h_count, 0);
    }

    #[test]
    fn rejects_bad_gradient() {
        let f = |x: ArrayView1<f64>| x.sum();
        let short = |_: ArrayView1<f64>| arr1(&[1.0]);
        let mut eval = Evaluator::new(&f, &short, None);
        match eval.dfunc(arr1(&[1.0, 2.0]).view()) {
            Err(NumericalFailure::Dimension(_)) => {}
            other => panic!("unexpected {:?}", other),
        }

        let nan = |x: ArrayView1<f64>| x.mapv(|_| std::f64::NAN);
        let mut eval = Evaluator::new(&f, &nan, None);
        assert!(eval.dfunc(arr1(&[1.0]).view()).is_err());
        assert_eq!(eval.g_count, 1);
    }

    #[test]
    fn gradient() {
        let function = |x: ArrayView1<f64>| 1.0 * x[0].powi(2) + 200. * x[1].powi(2);
        let x = arr1(&[1.0, 1.0]);
        let res = approx_fprime(x.view(), function, 1e-7);

        println!("Res: {}", res);
        assert!(approx_eq!(f64, res[0], 2.0, epsilon = 1e-4));
        assert!(approx_eq!(f64, res[1], 400.0, epsilon = 1e-3));
    }
}
