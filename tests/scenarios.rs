use std::cell::Cell;

use approx::AbsDiffEq;
use float_cmp::approx_eq;
use minfx::hessian_mods::{modify, shifted_cholesky};
use minfx::minimizer::MAX_ITER_WARNING;
use minfx::utils::approx_fprime;
use minfx::*;
use ndarray::prelude::*;
use proptest::prelude::*;

fn rosen(x: ArrayView1<f64>) -> f64 {
    100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2)
}

fn rosen_der(x: ArrayView1<f64>) -> Array1<f64> {
    arr1(&[
        -400.0 * x[0] * (x[1] - x[0] * x[0]) - 2.0 * (1.0 - x[0]),
        200.0 * (x[1] - x[0] * x[0]),
    ])
}

fn rosen_hess(x: ArrayView1<f64>) -> Array2<f64> {
    arr2(&[
        [1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0, -400.0 * x[0]],
        [-400.0 * x[0], 200.0],
    ])
}

fn start() -> Array1<f64> {
    arr1(&[-1.2, 1.0])
}

fn run_rosen(config: &Configuration) -> RunResult {
    minimize(&rosen, &rosen_der, Some(&rosen_hess), start().view(), config).unwrap()
}

fn tight(family: DirectionFamily) -> ConfigurationBuilder {
    let mut b = ConfigurationBuilder::default();
    b.family(family)
        .grad_tol(1e-8)
        .func_tol(1e-25)
        .max_iterations(100_000);
    b
}

#[test]
fn newton_on_parabola() {
    let f = |x: ArrayView1<f64>| x[0] * x[0];
    let g = |x: ArrayView1<f64>| arr1(&[2.0 * x[0]]);
    let h = |_: ArrayView1<f64>| arr2(&[[2.0]]);
    let config = ConfigurationBuilder::default()
        .family(DirectionFamily::Newton)
        .hessian_mod(HessianMod::Unmodified)
        .grad_tol(1e-8)
        .build()
        .unwrap();

    let res = minimize(&f, &g, Some(&h), arr1(&[10.0]).view(), &config).unwrap();
    assert_eq!(res.iterations, 1);
    assert_eq!(res.warning, None);
    assert_eq!(res.status, RunStatus::Converged);
    assert!(approx_eq!(f64, res.x[0], 0.0, epsilon = 1e-12));
    assert!(approx_eq!(f64, res.f, 0.0, epsilon = 1e-20));
    assert_eq!((res.f_count, res.g_count, res.h_count), (3, 3, 1));
}

#[test]
fn conjugate_gradient_rosenbrock() {
    let config = ConfigurationBuilder::default()
        .family(DirectionFamily::ConjugateGradient)
        .line_search(LineSearchAlgorithm::Backtrack)
        .func_tol(1e-10)
        .max_iterations(10_000)
        .build()
        .unwrap();
    let res = minimize(&rosen, &rosen_der, None, start().view(), &config).unwrap();
    assert_eq!(res.warning, None);
    assert!(res.x.abs_diff_eq(&arr1(&[1.0, 1.0]), 1e-2), "{}", res.x);
}

#[test]
fn shifted_cholesky_on_indefinite_matrix() {
    let h = arr2(&[[0.0, 1.0], [1.0, 0.0]]);
    let (l, tau) = shifted_cholesky(h.view(), std::f64::EPSILON).unwrap();
    assert!(tau > 0.0);
    assert!(approx_eq!(f64, tau, 2f64.sqrt(), ulps = 4));
    assert!(l.dot(&l.t()).abs_diff_eq(&(&h + &(Array2::<f64>::eye(2) * tau)), 1e-12));

    let g = arr1(&[1.0, 2.0]);
    let m = modify(HessianMod::Cholesky, g.view(), h.view(), std::f64::EPSILON).unwrap();
    assert!(m.pk.dot(&g) < 0.0);
}

#[test]
fn single_iteration_cap() {
    let config = ConfigurationBuilder::default()
        .family(DirectionFamily::Bfgs)
        .grad_tol(1e-8)
        .max_iterations(1)
        .build()
        .unwrap();
    let res = minimize(&rosen, &rosen_der, None, start().view(), &config).unwrap();
    assert_eq!(res.warning, Some(MAX_ITER_WARNING.to_string()));
    assert_eq!(res.iterations, 1);
    assert_eq!(res.status, RunStatus::MaxIterExceeded);
}

#[test]
fn call_counts_match_invocations() {
    let configs = vec![
        tight(DirectionFamily::Newton).build().unwrap(),
        tight(DirectionFamily::Bfgs)
            .line_search(LineSearchAlgorithm::NocedalWrightWolfe)
            .build()
            .unwrap(),
        tight(DirectionFamily::ConjugateGradient)
            .line_search(LineSearchAlgorithm::MoreThuente)
            .build()
            .unwrap(),
        tight(DirectionFamily::Newton)
            .line_search(LineSearchAlgorithm::NocedalWrightInterpol)
            .hessian_mod(HessianMod::Se99)
            .build()
            .unwrap(),
        tight(DirectionFamily::TrustRegion)
            .trust_region_solver(TrustRegionSolver::Dogleg)
            .build()
            .unwrap(),
    ];
    for config in &configs {
        let (fc, gc, hc) = (Cell::new(0), Cell::new(0), Cell::new(0));
        let f = |x: ArrayView1<f64>| {
            fc.set(fc.get() + 1);
            rosen(x)
        };
        let g = |x: ArrayView1<f64>| {
            gc.set(gc.get() + 1);
            rosen_der(x)
        };
        let h = |x: ArrayView1<f64>| {
            hc.set(hc.get() + 1);
            rosen_hess(x)
        };
        let res = minimize(&f, &g, Some(&h), start().view(), config).unwrap();
        assert_eq!(res.f_count, fc.get(), "{:?}", config);
        assert_eq!(res.g_count, gc.get(), "{:?}", config);
        assert_eq!(res.h_count, hc.get(), "{:?}", config);
        if !config.needs_hessian() {
            assert_eq!(res.h_count, 0);
        }
    }
}

#[test]
fn repeated_runs_are_identical() {
    let configs = vec![
        tight(DirectionFamily::Bfgs).build().unwrap(),
        tight(DirectionFamily::Newton)
            .hessian_mod(HessianMod::Eigenvalue)
            .build()
            .unwrap(),
        tight(DirectionFamily::TrustRegion).build().unwrap(),
    ];
    for config in &configs {
        assert_eq!(run_rosen(config), run_rosen(config));
    }
}

#[test]
fn sufficient_decrease_is_monotone() {
    let families = [
        DirectionFamily::SteepestDescent,
        DirectionFamily::Bfgs,
        DirectionFamily::ConjugateGradient,
        DirectionFamily::Newton,
    ];
    for &family in &families {
        let mut f_prev = rosen(start().view());
        for k in 1..40 {
            let config = tight(family)
                .line_search(LineSearchAlgorithm::Backtrack)
                .max_iterations(k)
                .build()
                .unwrap();
            let res = run_rosen(&config);
            assert!(res.f <= f_prev, "{} at iteration {}", family, k);
            f_prev = res.f;
        }
    }
}

fn assert_rosen_minimum(config: &Configuration) {
    let res = run_rosen(config);
    assert_eq!(res.status, RunStatus::Converged, "{:?}: {:?}", config, res);
    assert!(
        res.x.abs_diff_eq(&arr1(&[1.0, 1.0]), 1e-4),
        "{:?}: {}",
        config,
        res.x
    );
}

#[test]
fn newton_rosenbrock() {
    let combos = [
        (LineSearchAlgorithm::MoreThuente, HessianMod::Gmw),
        (LineSearchAlgorithm::MoreThuente, HessianMod::Unmodified),
        (LineSearchAlgorithm::Backtrack, HessianMod::Cholesky),
        (LineSearchAlgorithm::NocedalWrightInterpol, HessianMod::Se99),
        (LineSearchAlgorithm::NocedalWrightWolfe, HessianMod::Gmw),
        (LineSearchAlgorithm::NoSearch, HessianMod::Gmw),
    ];
    for &(search, modifier) in &combos {
        let config = tight(DirectionFamily::Newton)
            .line_search(search)
            .hessian_mod(modifier)
            .build()
            .unwrap();
        assert_rosen_minimum(&config);
    }
}

#[test]
fn bfgs_rosenbrock() {
    for &search in &[
        LineSearchAlgorithm::MoreThuente,
        LineSearchAlgorithm::NocedalWrightWolfe,
        LineSearchAlgorithm::Backtrack,
        LineSearchAlgorithm::NocedalWrightInterpol,
    ] {
        let config = tight(DirectionFamily::Bfgs)
            .line_search(search)
            .build()
            .unwrap();
        assert_rosen_minimum(&config);
    }
}

#[test]
fn conjugate_gradient_wolfe_rosenbrock() {
    for &search in &[
        LineSearchAlgorithm::MoreThuente,
        LineSearchAlgorithm::NocedalWrightWolfe,
    ] {
        let config = tight(DirectionFamily::ConjugateGradient)
            .line_search(search)
            .build()
            .unwrap();
        assert_rosen_minimum(&config);
    }
}

#[test]
fn steepest_descent_rosenbrock() {
    let config = tight(DirectionFamily::SteepestDescent).build().unwrap();
    assert_rosen_minimum(&config);
}

#[test]
fn trust_region_rosenbrock() {
    for &solver in &[TrustRegionSolver::Exact, TrustRegionSolver::Dogleg] {
        for &modifier in &[HessianMod::Gmw, HessianMod::Cholesky, HessianMod::Unmodified] {
            let config = tight(DirectionFamily::TrustRegion)
                .trust_region_solver(solver)
                .hessian_mod(modifier)
                .build()
                .unwrap();
            assert_rosen_minimum(&config);
        }
    }
}

#[test]
fn rosenbrock_gradient_matches_finite_differences() {
    for x in &[arr1(&[-1.2, 1.0]), arr1(&[0.5, 0.5]), arr1(&[2.0, -1.0])] {
        let approx = approx_fprime(x.view(), rosen, 1e-7);
        let exact = rosen_der(x.view());
        for (a, e) in approx.iter().zip(exact.iter()) {
            assert!((a - e).abs() <= 1e-3 * (1.0 + e.abs()), "{} vs {}", a, e);
        }
    }
}

#[test]
fn gradient_of_wrong_length() {
    let f = |x: ArrayView1<f64>| x.dot(&x);
    let g = |_: ArrayView1<f64>| arr1(&[1.0]);
    let config = tight(DirectionFamily::Bfgs).build().unwrap();
    let res = minimize(&f, &g, None, arr1(&[1.0, 2.0]).view(), &config).unwrap();
    assert_eq!(res.status, RunStatus::Failed);
    assert_eq!(res.iterations, 0);
    assert!(res.warning.unwrap().starts_with("DimensionError"));
}

#[test]
fn configuration_errors_precede_evaluation() {
    let calls = Cell::new(0);
    let f = |x: ArrayView1<f64>| {
        calls.set(calls.get() + 1);
        rosen(x)
    };
    let config = tight(DirectionFamily::TrustRegion).build().unwrap();
    let err = minimize(&f, &rosen_der, None, start().view(), &config).unwrap_err();
    assert_eq!(err, ConfigError::MissingHessian(DirectionFamily::TrustRegion));
    assert_eq!(calls.get(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn newton_solves_convex_quadratics(
        n in 1usize..4,
        m in prop::collection::vec(-2.0f64..2.0, 9),
        x0 in prop::collection::vec(-10.0f64..10.0, 3),
    ) {
        let a = Array2::from_shape_fn((n, n), |(i, j)| {
            (0..n).map(|k| m[k * 3 + i] * m[k * 3 + j]).sum::<f64>()
                + if i == j { 1.0 } else { 0.0 }
        });
        let f = |x: ArrayView1<f64>| x.dot(&a.dot(&x));
        let g = |x: ArrayView1<f64>| a.dot(&x) * 2.0;
        let h = |_: ArrayView1<f64>| &a * 2.0;
        let config = ConfigurationBuilder::default()
            .family(DirectionFamily::Newton)
            .hessian_mod(HessianMod::Unmodified)
            .grad_tol(1e-6)
            .build()
            .unwrap();

        let x0 = Array1::from(x0[..n].to_vec());
        let res = minimize(&f, &g, Some(&h), x0.view(), &config).unwrap();
        prop_assert_eq!(res.status, RunStatus::Converged);
        prop_assert_eq!(res.iterations, 1);
        prop_assert!(res.x.iter().all(|v| v.abs() < 1e-8));
    }
}
