//! Segment basis functions.
//!
//! Every segment expresses its response as a linear combination of basis
//! functions of the frame-normalized coordinate `u = (x - origin) / width`.
//! The families mirror the usual curve-building choices: monomials, the two
//! tension-spline families and the linear/tension hat pairs used for
//! two-parameter local segments.
//!
//! [`BasisSetParams`] is the serializable description, [`BasisSet`] the
//! validated evaluator built from it.

mod shape;

pub use shape::ShapeControl;

use crate::error::{SplineError, SplineResult};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable description of a basis family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum BasisSetParams {
    /// Monomials `u^k` for `k = 0..=degree`.
    Polynomial {
        /// Polynomial degree (at least 1).
        degree: usize,
    },
    /// `1, u, e^{τu}, e^{-τu}`.
    ExponentialTension {
        /// Tension `τ > 0`.
        tension: f64,
    },
    /// `1, u, cosh(τu), sinh(τu)`.
    HyperbolicTension {
        /// Tension `τ > 0`.
        tension: f64,
    },
    /// `1 - u, u`.
    LinearHatPair,
    /// `sinh(τ(1-u)) / sinh(τ), sinh(τu) / sinh(τ)`.
    TensionHatPair {
        /// Tension `τ > 0`.
        tension: f64,
    },
}

impl BasisSetParams {
    /// Cubic polynomial basis, the default for curve segments.
    #[must_use]
    pub const fn cubic() -> Self {
        Self::Polynomial { degree: 3 }
    }

    /// Validates the parameters and builds the evaluator.
    pub fn build(&self) -> SplineResult<BasisSet> {
        BasisSet::new(*self)
    }
}

impl Default for BasisSetParams {
    fn default() -> Self {
        Self::cubic()
    }
}

impl fmt::Display for BasisSetParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polynomial { degree } => write!(f, "Polynomial(degree={degree})"),
            Self::ExponentialTension { tension } => write!(f, "ExponentialTension(τ={tension})"),
            Self::HyperbolicTension { tension } => write!(f, "HyperbolicTension(τ={tension})"),
            Self::LinearHatPair => write!(f, "LinearHatPair"),
            Self::TensionHatPair { tension } => write!(f, "TensionHatPair(τ={tension})"),
        }
    }
}

/// Validated basis evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisSet {
    params: BasisSetParams,
}

fn validate_tension(tension: f64) -> SplineResult<()> {
    if !tension.is_finite() || tension <= 0.0 {
        return Err(SplineError::invalid_input(format!(
            "Tension must be finite and positive, got {tension}"
        )));
    }
    Ok(())
}

impl BasisSet {
    /// Validates `params`.
    ///
    /// Polynomial degree must be at least 1; tensions must be finite and
    /// positive. A tension hat pair additionally needs `sinh τ` to be
    /// representable.
    pub fn new(params: BasisSetParams) -> SplineResult<Self> {
        match params {
            BasisSetParams::Polynomial { degree } => {
                if degree == 0 {
                    return Err(SplineError::invalid_input(
                        "Polynomial basis needs degree >= 1",
                    ));
                }
            }
            BasisSetParams::ExponentialTension { tension }
            | BasisSetParams::HyperbolicTension { tension } => validate_tension(tension)?,
            BasisSetParams::TensionHatPair { tension } => {
                validate_tension(tension)?;
                if !tension.sinh().is_finite() {
                    return Err(SplineError::invalid_input(format!(
                        "Tension {tension} overflows the hat pair normalization"
                    )));
                }
            }
            BasisSetParams::LinearHatPair => {}
        }
        Ok(Self { params })
    }

    /// Returns the parameters this basis was built from.
    #[must_use]
    pub fn params(&self) -> BasisSetParams {
        self.params
    }

    /// Number of basis functions.
    #[must_use]
    pub fn dimension(&self) -> usize {
        match self.params {
            BasisSetParams::Polynomial { degree } => degree + 1,
            BasisSetParams::ExponentialTension { .. } | BasisSetParams::HyperbolicTension { .. } => 4,
            BasisSetParams::LinearHatPair | BasisSetParams::TensionHatPair { .. } => 2,
        }
    }

    /// Highest derivative order that is not identically zero, `None` when
    /// every order is meaningful.
    #[must_use]
    pub fn highest_derivative(&self) -> Option<usize> {
        match self.params {
            BasisSetParams::Polynomial { degree } => Some(degree),
            BasisSetParams::LinearHatPair => Some(1),
            _ => None,
        }
    }

    /// Returns true if derivatives of `order` carry information.
    #[must_use]
    pub fn supports_derivative(&self, order: usize) -> bool {
        self.highest_derivative().map_or(true, |highest| order <= highest)
    }

    /// Evaluates the `order`-th `u`-derivative of basis function `index`.
    ///
    /// `index` must be below [`dimension`](Self::dimension).
    #[must_use]
    pub fn evaluate(&self, index: usize, u: f64, order: usize) -> f64 {
        match self.params {
            BasisSetParams::Polynomial { .. } => {
                if order > index {
                    return 0.0;
                }
                let falling: f64 = ((index - order + 1)..=index).map(|k| k as f64).product();
                falling * u.powi((index - order) as i32)
            }
            BasisSetParams::ExponentialTension { tension } => match index {
                0 => unit_or_zero(order),
                1 => linear(u, order),
                2 => tension.powi(order as i32) * (tension * u).exp(),
                _ => (-tension).powi(order as i32) * (-tension * u).exp(),
            },
            BasisSetParams::HyperbolicTension { tension } => {
                let scale = tension.powi(order as i32);
                let even = order % 2 == 0;
                match index {
                    0 => unit_or_zero(order),
                    1 => linear(u, order),
                    2 => scale * if even { (tension * u).cosh() } else { (tension * u).sinh() },
                    _ => scale * if even { (tension * u).sinh() } else { (tension * u).cosh() },
                }
            }
            BasisSetParams::LinearHatPair => match (index, order) {
                (0, 0) => 1.0 - u,
                (0, 1) => -1.0,
                (_, 0) => u,
                (_, 1) => 1.0,
                _ => 0.0,
            },
            BasisSetParams::TensionHatPair { tension } => {
                let norm = tension.sinh();
                let even = order % 2 == 0;
                if index == 0 {
                    let arg = tension * (1.0 - u);
                    let hyper = if even { arg.sinh() } else { arg.cosh() };
                    (-tension).powi(order as i32) * hyper / norm
                } else {
                    let arg = tension * u;
                    let hyper = if even { arg.sinh() } else { arg.cosh() };
                    tension.powi(order as i32) * hyper / norm
                }
            }
        }
    }

    /// Evaluates all basis functions (or their derivatives) at `u`.
    #[must_use]
    pub fn row(&self, u: f64, order: usize) -> DVector<f64> {
        DVector::from_iterator(
            self.dimension(),
            (0..self.dimension()).map(|i| self.evaluate(i, u, order)),
        )
    }

    /// Basis row of the shaped response `s(u) · Σ c_k b_k(u)`.
    ///
    /// The `order`-th derivative follows the Leibniz rule
    /// `Σ_j C(order, j) s^{(order-j)}(u) b_k^{(j)}(u)`.
    #[must_use]
    pub fn shaped_row(&self, shape: Option<&ShapeControl>, u: f64, order: usize) -> DVector<f64> {
        let Some(shape) = shape else {
            return self.row(u, order);
        };

        let mut row = DVector::zeros(self.dimension());
        let mut binomial = 1.0;
        for j in 0..=order {
            if j > 0 {
                binomial = binomial * (order - j + 1) as f64 / j as f64;
            }
            let factor = binomial * shape.evaluate(u, order - j);
            if factor != 0.0 {
                row += self.row(u, j) * factor;
            }
        }
        row
    }
}

impl fmt::Display for BasisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.params.fmt(f)
    }
}

fn unit_or_zero(order: usize) -> f64 {
    if order == 0 {
        1.0
    } else {
        0.0
    }
}

fn linear(u: f64, order: usize) -> f64 {
    match order {
        0 => u,
        1 => 1.0,
        _ => 0.0,
    }
}
