//! One-dimensional root finding.
//!
//! Curve calibration solves one scalar equation per instrument: the value of
//! the segment's right-edge response that makes the instrument reprice to
//! its quote. These solvers cover that use:
//!
//! - [`newton_raphson`]: quadratic convergence when a derivative is known
//! - [`brent`]: guaranteed convergence inside a sign-changing bracket
//! - [`hybrid`]: Newton with a Brent fallback, locating a bracket itself
//!   when none is supplied
//!
//! # Example
//!
//! ```rust
//! use knotwork_math::solvers::{hybrid_numerical, SolverConfig};
//!
//! // Continuously compounded zero rate that reproduces a 5y discount factor
//! let target_df = 0.85;
//! let f = |r: f64| (-r * 5.0).exp() - target_df;
//!
//! let result = hybrid_numerical(f, 0.02, None, &SolverConfig::default()).unwrap();
//! assert!((result.root - (-target_df.ln() / 5.0)).abs() < 1e-9);
//! ```

mod brent;
mod hybrid;
mod newton;

pub use brent::brent;
pub use hybrid::{find_bracket, hybrid, hybrid_numerical};
pub use newton::newton_raphson;

/// Default tolerance for root-finding algorithms.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Default maximum iterations for root-finding algorithms.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Configuration for root-finding algorithms.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Tolerance for convergence, applied to both the residual and the step.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolverConfig {
    /// Creates a new solver configuration.
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Result of a root-finding iteration.
#[derive(Debug, Clone, Copy)]
pub struct SolverResult {
    /// The root found.
    pub root: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Final residual (function value at root).
    pub residual: f64,
}
