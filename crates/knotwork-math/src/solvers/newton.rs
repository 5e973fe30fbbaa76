//! Newton-Raphson root-finding algorithm.

use crate::error::{MathError, MathResult};
use crate::solvers::{SolverConfig, SolverResult};

/// Smallest derivative magnitude Newton will divide by.
pub(crate) const MIN_DERIVATIVE: f64 = 1e-15;

/// Newton-Raphson root-finding algorithm.
///
/// Iterates `x_{n+1} = x_n - f(x_n) / f'(x_n)` and stops once either the
/// residual or the step falls below the configured tolerance.
///
/// # Example
///
/// ```rust
/// use knotwork_math::solvers::{newton_raphson, SolverConfig};
///
/// // Discount factor whose log equals -rt for r = 3%, t = 2
/// let f = |df: f64| df.ln() + 0.06;
/// let d = |df: f64| 1.0 / df;
///
/// let result = newton_raphson(f, d, 1.0, &SolverConfig::new(1e-14, 50)).unwrap();
/// assert!((result.root - (-0.06f64).exp()).abs() < 1e-12);
/// ```
pub fn newton_raphson<F, DF>(
    f: F,
    df: DF,
    initial_guess: f64,
    config: &SolverConfig,
) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
    DF: Fn(f64) -> f64,
{
    let mut x = initial_guess;

    for iteration in 0..config.max_iterations {
        let fx = f(x);

        if fx.abs() < config.tolerance {
            return Ok(SolverResult {
                root: x,
                iterations: iteration,
                residual: fx,
            });
        }

        let dfx = df(x);
        if dfx.abs() < MIN_DERIVATIVE {
            return Err(MathError::DivisionByZero { value: dfx });
        }

        let step = fx / dfx;
        x -= step;

        if !x.is_finite() {
            return Err(MathError::invalid_input("Newton produced non-finite value"));
        }

        if step.abs() < config.tolerance {
            return Ok(SolverResult {
                root: x,
                iterations: iteration + 1,
                residual: f(x),
            });
        }
    }

    Err(MathError::convergence_failed(
        config.max_iterations,
        f(x).abs(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic_response() {
        // Cubic segment response hitting a target level
        let f = |u: f64| 1.0 + 0.5 * u - 0.2 * u * u + 0.05 * u * u * u - 1.3;
        let df = |u: f64| 0.5 - 0.4 * u + 0.15 * u * u;

        let result = newton_raphson(f, df, 0.5, &SolverConfig::default()).unwrap();

        assert!(f(result.root).abs() < 1e-10);
        assert!(result.iterations < 10);
    }

    #[test]
    fn test_zero_derivative_error() {
        let f = |x: f64| x * x + 1.0;
        let df = |x: f64| 2.0 * x;

        let result = newton_raphson(f, df, 0.0, &SolverConfig::default());

        assert!(matches!(result, Err(MathError::DivisionByZero { .. })));
    }

    #[test]
    fn test_iteration_limit() {
        // No real root, Newton wanders
        let f = |x: f64| x * x + 1.0;
        let df = |x: f64| 2.0 * x;

        let result = newton_raphson(f, df, 0.3, &SolverConfig::new(1e-12, 8));

        assert!(result.is_err());
    }

    #[test]
    fn test_survival_probability_from_hazard() {
        let f = |h: f64| (-h * 4.0).exp() - 0.92;
        let df = |h: f64| -4.0 * (-h * 4.0).exp();

        let result = newton_raphson(f, df, 0.0, &SolverConfig::default()).unwrap();

        assert_relative_eq!(result.root, -(0.92f64).ln() / 4.0, epsilon = 1e-10);
    }
}
