//! Polynomial interpolation of sampled step lengths.

/// Minimiser of the quadratic matching `phi(0) = f0`, `phi'(0) = d0` and `phi(a) = fa`.
pub fn quadratic(f0: f64, d0: f64, a: f64, fa: f64) -> f64 {
    -d0 * a * a / (2.0 * (fa - f0 - d0 * a))
}

/// Minimiser of the cubic matching `phi(0)`, `phi'(0)` and the two most recent samples
/// `(a1, f1)`, `(a2, f2)` (Nocedal and Wright, eq. 3.58). `None` if the cubic has no local
/// minimum.
pub fn cubic(f0: f64, d0: f64, a1: f64, f1: f64, a2: f64, f2: f64) -> Option<f64> {
    let denom = a1 * a1 * a2 * a2 * (a2 - a1);
    let r2 = f2 - f0 - d0 * a2;
    let r1 = f1 - f0 - d0 * a1;
    let a = (a1 * a1 * r2 - a2 * a2 * r1) / denom;
    let b = (-a1.powi(3) * r2 + a2.powi(3) * r1) / denom;
    if a == 0.0 {
        return if b != 0.0 { Some(-d0 / (2.0 * b)) } else { None };
    }
    let disc = b * b - 3.0 * a * d0;
    if disc < 0.0 {
        return None;
    }
    Some((-b + disc.sqrt()) / (3.0 * a))
}

/// Minimiser of the cubic through two points with known values and slopes (Nocedal and Wright,
/// eq. 3.59). `None` if the cubic has no local minimum.
pub fn cubic_hermite(a: f64, fa: f64, da: f64, b: f64, fb: f64, db: f64) -> Option<f64> {
    let d1 = da + db - 3.0 * (fa - fb) / (a - b);
    let d2_sq = d1 * d1 - da * db;
    if d2_sq < 0.0 {
        return None;
    }
    let d2 = d2_sq.sqrt().copysign(b - a);
    Some(b - (b - a) * (db + d2 - d1) / (db - da + 2.0 * d2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn exact_on_quadratics() {
        let phi = |a: f64| (a - 0.3).powi(2);
        let m = quadratic(phi(0.0), -0.6, 1.0, phi(1.0));
        assert!(approx_eq!(f64, m, 0.3, ulps = 4));
    }

    #[test]
    fn exact_on_cubics() {
        // phi(a) = a^3 - 3a, minimum at 1
        let phi = |a: f64| a.powi(3) - 3.0 * a;
        let dphi = |a: f64| 3.0 * a * a - 3.0;
        let m = cubic(phi(0.0), dphi(0.0), 2.0, phi(2.0), 1.5, phi(1.5)).unwrap();
        assert!(approx_eq!(f64, m, 1.0, epsilon = 1e-12));
        let m = cubic_hermite(0.5, phi(0.5), dphi(0.5), 2.0, phi(2.0), dphi(2.0)).unwrap();
        assert!(approx_eq!(f64, m, 1.0, epsilon = 1e-12));
    }
}
