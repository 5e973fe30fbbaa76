//! Shape controllers applied on top of a segment basis.

use crate::error::{SplineError, SplineResult};
use serde::{Deserialize, Serialize};

/// Multiplicative shape function `s(u)` applied to a segment response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeControl {
    /// `1 / (1 + λu)`, requires `λ > -1`.
    RationalLinear {
        /// Shape parameter.
        lambda: f64,
    },
    /// `e^{-λu}`.
    Exponential {
        /// Shape parameter.
        lambda: f64,
    },
}

impl ShapeControl {
    /// Checks that the shape function is finite and positive on `[0, 1]`.
    pub fn validate(&self) -> SplineResult<()> {
        match *self {
            Self::RationalLinear { lambda } => {
                if !lambda.is_finite() || lambda <= -1.0 {
                    return Err(SplineError::invalid_input(format!(
                        "Rational-linear shape needs finite λ > -1, got {lambda}"
                    )));
                }
            }
            Self::Exponential { lambda } => {
                if !lambda.is_finite() {
                    return Err(SplineError::invalid_input(format!(
                        "Exponential shape needs finite λ, got {lambda}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Evaluates the `order`-th derivative of the shape function at `u`.
    #[must_use]
    pub fn evaluate(&self, u: f64, order: usize) -> f64 {
        match *self {
            Self::RationalLinear { lambda } => {
                // d^n/du^n (1 + λu)^-1 = (-λ)^n n! (1 + λu)^-(n+1)
                let factorial: f64 = (1..=order).map(|k| k as f64).product();
                (-lambda).powi(order as i32) * factorial / (1.0 + lambda * u).powi(order as i32 + 1)
            }
            Self::Exponential { lambda } => (-lambda).powi(order as i32) * (-lambda * u).exp(),
        }
    }
}
