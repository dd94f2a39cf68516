//! Small scalar solvers used by hat construction.
//!
//! - `minimize_bounded`: Brent's derivative-free minimization on `[low, high]`
//!   (golden section with parabolic interpolation).
//!
//! Code cross-refs: `hat::tangent::fit_cone`

const GOLDEN: f64 = 0.381_966_011_250_105_1; // (3 - sqrt(5)) / 2
const MAX_ITER: usize = 500;

/// Minimize `f` over `[low, high]` starting from `guess`; returns the abscissa.
///
/// Pre: `low <= high`; `tol > 0`.
/// Post: result lies in `[low, high]`. Non-finite function values are
/// tolerated (the step falls back to golden section), so `f` may return
/// `+inf` on parts of the interval.
pub fn minimize_bounded<F: FnMut(f64) -> f64>(
    mut f: F,
    low: f64,
    high: f64,
    guess: f64,
    tol: f64,
) -> f64 {
    let (mut a, mut b) = if low <= high { (low, high) } else { (high, low) };
    if b - a <= 0.0 {
        return a;
    }
    let eps = f64::EPSILON.sqrt();

    let mut x = if (a..=b).contains(&guess) {
        guess
    } else {
        a + GOLDEN * (b - a)
    };
    let mut w = x;
    let mut v = x;
    let mut fx = f(x);
    let mut fw = fx;
    let mut fv = fx;
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for _ in 0..MAX_ITER {
        let m = 0.5 * (a + b);
        let tol1 = eps * x.abs() + tol / 3.0;
        let tol2 = 2.0 * tol1;
        if (x - m).abs() <= tol2 - 0.5 * (b - a) {
            break;
        }

        let mut golden = true;
        if e.abs() > tol1 && fx.is_finite() && fw.is_finite() && fv.is_finite() {
            // parabola through (v,fv), (w,fw), (x,fx)
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            } else {
                q = -q;
            }
            let prev_e = e;
            if p.abs() < (0.5 * q * prev_e).abs() && p > q * (a - x) && p < q * (b - x) {
                e = d;
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = if x < m { tol1 } else { -tol1 };
                }
                golden = false;
            }
        }
        if golden {
            e = if x < m { b - x } else { a - x };
            d = GOLDEN * e;
        }

        let u = if d.abs() >= tol1 {
            x + d
        } else if d > 0.0 {
            x + tol1
        } else {
            x - tol1
        };
        let fu = f(u);

        if fu <= fx {
            if u < x {
                b = x;
            } else {
                a = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }
    x.clamp(low.min(high), low.max(high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_parabola_minimum() {
        let x = minimize_bounded(|x| (x - 0.3) * (x - 0.3) + 1.0, 0.0, 1.0, 0.9, 1e-8);
        assert!((x - 0.3).abs() < 1e-6);
    }

    #[test]
    fn stays_on_boundary_for_monotone_objective() {
        let x = minimize_bounded(|x| x, 0.2, 0.8, 0.5, 1e-6);
        assert!((0.2..=0.8).contains(&x));
        assert!(x - 0.2 < 1e-4);
    }

    #[test]
    fn tolerates_infinite_values() {
        let f = |x: f64| {
            if x < 0.1 {
                f64::INFINITY
            } else {
                (x - 0.6).powi(2)
            }
        };
        let x = minimize_bounded(f, 0.0, 1.0, 0.5, 1e-7);
        assert!((x - 0.6).abs() < 1e-4);
    }

    #[test]
    fn collapsed_interval_returns_endpoint() {
        let x = minimize_bounded(|x| x * x, 0.4, 0.4, 0.0, 1e-6);
        assert_eq!(x, 0.4);
    }

    #[test]
    fn guess_outside_interval_is_ignored() {
        let x = minimize_bounded(|x| (x + 1.0).cos(), 0.0, 4.0, 10.0, 1e-8);
        // cos(y) minimal at y = π
        assert!((x - (std::f64::consts::PI - 1.0)).abs() < 1e-5);
    }
}
