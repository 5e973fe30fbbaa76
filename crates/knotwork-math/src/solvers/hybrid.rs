//! Newton-Raphson with a bracketing fallback.
//!
//! Calibration rarely has a sensible bracket ahead of time: the unknown is
//! the response at the right edge of a new segment, whose scale depends on
//! the latent state. The hybrid solver starts Newton from the previous
//! knot's response and, if Newton stalls or diverges, searches outward for a
//! sign change and finishes with Brent.

use crate::error::{MathError, MathResult};
use crate::solvers::newton::MIN_DERIVATIVE;
use crate::solvers::{brent, SolverConfig, SolverResult};

/// Consecutive residual blow-ups tolerated before Newton is abandoned.
const MAX_DIVERGENT_STEPS: u32 = 3;

/// Newton iterations attempted before falling back.
const NEWTON_ITERATION_CAP: u32 = 20;

/// Central difference step for the numerical derivative.
const DIFFERENCE_STEP: f64 = 1e-8;

/// Hybrid root-finding algorithm.
///
/// Tries Newton first. On a zero derivative, a non-finite iterate, repeated
/// divergence or iteration exhaustion it switches to Brent on `bounds`, or on
/// a bracket located by [`find_bracket`] when no bounds are given.
///
/// # Example
///
/// ```rust
/// use knotwork_math::solvers::{hybrid, SolverConfig};
///
/// let f = |x: f64| x * x * x - x - 2.0;
/// let df = |x: f64| 3.0 * x * x - 1.0;
///
/// let result = hybrid(f, df, 1.5, Some((1.0, 2.0)), &SolverConfig::default()).unwrap();
/// assert!(f(result.root).abs() < 1e-10);
/// ```
pub fn hybrid<F, DF>(
    f: F,
    df: DF,
    initial_guess: f64,
    bounds: Option<(f64, f64)>,
    config: &SolverConfig,
) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
    DF: Fn(f64) -> f64,
{
    if let Ok(result) = newton_with_monitoring(&f, &df, initial_guess, config) {
        return Ok(result);
    }

    let (a, b) = match bounds {
        Some(bracket) => bracket,
        None => find_bracket(&f, initial_guess).ok_or_else(|| {
            MathError::invalid_input(format!(
                "Newton-Raphson failed from {initial_guess} and no sign change was found"
            ))
        })?,
    };

    brent(&f, a, b, config)
}

/// Hybrid solver with a central-difference derivative.
pub fn hybrid_numerical<F>(
    f: F,
    initial_guess: f64,
    bounds: Option<(f64, f64)>,
    config: &SolverConfig,
) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
{
    let scale = initial_guess.abs().max(1.0);
    let h = DIFFERENCE_STEP * scale;
    let df = |x: f64| (f(x + h) - f(x - h)) / (2.0 * h);

    hybrid(&f, df, initial_guess, bounds, config)
}

fn newton_with_monitoring<F, DF>(
    f: &F,
    df: &DF,
    initial_guess: f64,
    config: &SolverConfig,
) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
    DF: Fn(f64) -> f64,
{
    let mut x = initial_guess;
    let mut previous_residual = f64::MAX;
    let mut divergent_steps = 0;
    let cap = config.max_iterations.min(NEWTON_ITERATION_CAP);

    for iteration in 0..cap {
        let fx = f(x);
        let residual = fx.abs();

        if !residual.is_finite() {
            return Err(MathError::invalid_input("Newton produced non-finite residual"));
        }
        if residual < config.tolerance {
            return Ok(SolverResult {
                root: x,
                iterations: iteration,
                residual: fx,
            });
        }

        if residual > 2.0 * previous_residual {
            divergent_steps += 1;
            if divergent_steps >= MAX_DIVERGENT_STEPS {
                return Err(MathError::invalid_input("Newton-Raphson diverging"));
            }
        } else {
            divergent_steps = 0;
        }
        previous_residual = residual;

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
            let final_fx = f(x);
            if final_fx.abs().is_finite() {
                return Ok(SolverResult {
                    root: x,
                    iterations: iteration + 1,
                    residual: final_fx,
                });
            }
        }
    }

    Err(MathError::convergence_failed(cap, f(x).abs()))
}

/// Searches outward from `initial_guess` for an interval on which `f`
/// changes sign, doubling the search radius each round.
pub fn find_bracket<F>(f: &F, initial_guess: f64) -> Option<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let f_center = f(initial_guess);
    if f_center == 0.0 {
        return Some((initial_guess, initial_guess));
    }

    let mut delta = 0.01 * initial_guess.abs().max(1.0);

    for _ in 0..60 {
        let left = initial_guess - delta;
        let right = initial_guess + delta;
        let f_left = f(left);
        let f_right = f(right);

        if f_left.is_finite() && f_left * f_center <= 0.0 {
            return Some((left, initial_guess));
        }
        if f_right.is_finite() && f_right * f_center <= 0.0 {
            return Some((initial_guess, right));
        }

        delta *= 2.0;
        if delta > 1e8 {
            break;
        }
    }

    None
}
