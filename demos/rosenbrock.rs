use minfx::{minimize, ConfigurationBuilder, DirectionFamily, LineSearchAlgorithm};
use ndarray::prelude::*;

fn main() {
    let f = |x: ArrayView1<f64>| 100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2);
    let g = |x: ArrayView1<f64>| {
        arr1(&[
            -400.0 * x[0] * (x[1] - x[0] * x[0]) - 2.0 * (1.0 - x[0]),
            200.0 * (x[1] - x[0] * x[0]),
        ])
    };
    let h = |x: ArrayView1<f64>| {
        arr2(&[
            [1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0, -400.0 * x[0]],
            [-400.0 * x[0], 200.0],
        ])
    };
    let x0 = arr1(&[-1.2, 1.0]);

    for &family in &[
        DirectionFamily::SteepestDescent,
        DirectionFamily::ConjugateGradient,
        DirectionFamily::Bfgs,
        DirectionFamily::Newton,
        DirectionFamily::TrustRegion,
    ] {
        let mut builder = ConfigurationBuilder::default();
        builder.family(family).grad_tol(1e-8).func_tol(1e-25);
        if family != DirectionFamily::TrustRegion {
            builder.line_search(LineSearchAlgorithm::MoreThuente);
        }
        let config = match builder.build() {
            Ok(config) => config,
            Err(err) => {
                println!("{}: {}", family, err);
                continue;
            }
        };
        match minimize(&f, &g, Some(&h), x0.view(), &config) {
            Ok(res) => println!(
                "{:<20} x = {}  f = {:e}  k = {}  calls = ({}, {}, {})  {:?}",
                family.to_string(),
                res.x,
                res.f,
                res.iterations,
                res.f_count,
                res.g_count,
                res.h_count,
                res.status
            ),
            Err(err) => println!("{}: {}", family, err),
        }
    }
}
