//! Brent's root-finding algorithm.

use crate::error::{MathError, MathResult};
use crate::solvers::{SolverConfig, SolverResult};

/// Brent's root-finding algorithm.
///
/// Keeps a sign-changing bracket `[b, c]` around the root and at each step
/// chooses between inverse quadratic interpolation, the secant step and
/// bisection, falling back to bisection whenever the interpolated step would
/// not shrink the bracket fast enough.
///
/// Requires `f(a)` and `f(b)` to have opposite signs (or one of them zero).
///
/// # Example
///
/// ```rust
/// use knotwork_math::solvers::{brent, SolverConfig};
///
/// // Flat hazard rate giving a 5y survival probability of 0.9
/// let f = |h: f64| (-5.0 * h).exp() - 0.9;
///
/// let result = brent(f, 0.0, 1.0, &SolverConfig::default()).unwrap();
/// assert!(f(result.root).abs() < 1e-10);
/// ```
pub fn brent<F>(f: F, a: f64, b: f64, config: &SolverConfig) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
{
    let mut a = a;
    let mut b = b;
    let mut fa = f(a);
    let mut fb = f(b);

    if fa == 0.0 {
        return Ok(SolverResult {
            root: a,
            iterations: 0,
            residual: 0.0,
        });
    }
    if fa * fb > 0.0 {
        return Err(MathError::InvalidBracket { a, b, fa, fb });
    }

    // c is the contrapoint: f(b) and f(c) always straddle zero
    let mut c = a;
    let mut fc = fa;
    let mut step = b - a;
    let mut previous_step = step;

    for iteration in 0..config.max_iterations {
        if fb * fc > 0.0 {
            c = a;
            fc = fa;
            step = b - a;
            previous_step = step;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * config.tolerance;
        let midpoint = 0.5 * (c - b);

        if fb.abs() < config.tolerance || midpoint.abs() <= tol {
            return Ok(SolverResult {
                root: b,
                iterations: iteration,
                residual: fb,
            });
        }

        if previous_step.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // Secant
                (2.0 * midpoint * s, 1.0 - s)
            } else {
                // Inverse quadratic interpolation
                let qa = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * midpoint * qa * (qa - r) - (b - a) * (r - 1.0)),
                    (qa - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();

            let limit_interp = 3.0 * midpoint * q - (tol * q).abs();
            let limit_previous = (previous_step * q).abs();
            if 2.0 * p < limit_interp.min(limit_previous) {
                previous_step = step;
                step = p / q;
            } else {
                step = midpoint;
                previous_step = step;
            }
        } else {
            step = midpoint;
            previous_step = step;
        }

        a = b;
        fa = fb;
        b += if step.abs() > tol {
            step
        } else {
            tol.copysign(midpoint)
        };
        fb = f(b);
    }

    Err(MathError::convergence_failed(
        config.max_iterations,
        fb.abs(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_discount_factor_level() {
        let f = |r: f64| (-r * 7.0).exp() - 0.75;

        let result = brent(f, -0.05, 0.20, &SolverConfig::default()).unwrap();

        assert_relative_eq!(result.root, -(0.75f64).ln() / 7.0, epsilon = 1e-10);
    }

    #[test]
    fn test_futures_price_to_rate() {
        // Convexity-free futures rate from a price quote of 96.25
        let f = |rate: f64| 100.0 * (1.0 - rate) - 96.25;

        let result = brent(f, 0.0, 0.2, &SolverConfig::default()).unwrap();

        assert_relative_eq!(result.root, 0.0375, epsilon = 1e-10);
    }

    #[test]
    fn test_root_at_endpoint() {
        let f = |x: f64| x - 1.0;

        let result = brent(f, 1.0, 2.0, &SolverConfig::default()).unwrap();

        assert_eq!(result.iterations, 0);
        assert_eq!(result.root, 1.0);
    }

    #[test]
    fn test_invalid_bracket() {
        let f = |x: f64| x * x + 0.01;

        let result = brent(f, -1.0, 1.0, &SolverConfig::default());

        assert!(matches!(result, Err(MathError::InvalidBracket { .. })));
    }

    #[test]
    fn test_steep_function_converges_quickly() {
        let f = |x: f64| x.powi(9) - 0.5;

        let result = brent(f, 0.0, 2.0, &SolverConfig::default()).unwrap();

        assert!(f(result.root).abs() < 1e-10);
        assert!(result.iterations < 60);
    }
}
