//! Latent states and the metrics that quantify them.
//!
//! A latent state is the unobserved curve being inferred (funding discount
//! curve, a forward projection curve, a credit survival curve). The
//! quantification metric says what the spline response *is*: the factor
//! itself, a continuously compounded zero rate or an instantaneous forward
//! rate.

use crate::error::{CurveError, CurveResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The curve being calibrated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum LatentState {
    /// Funding (discount) curve.
    Funding,
    /// Projection curve of a floating rate index.
    Forward(String),
    /// Survival curve of a credit reference entity.
    Credit(String),
}

impl LatentState {
    /// Forward state for `index`.
    #[must_use]
    pub fn forward(index: impl Into<String>) -> Self {
        Self::Forward(index.into())
    }

    /// Credit state for `reference`.
    #[must_use]
    pub fn credit(reference: impl Into<String>) -> Self {
        Self::Credit(reference.into())
    }

    /// Rejects blank index and reference labels.
    pub fn validate(&self) -> CurveResult<()> {
        match self {
            Self::Funding => Ok(()),
            Self::Forward(label) | Self::Credit(label) if label.trim().is_empty() => Err(
                CurveError::invalid_input(format!("Latent state {self} needs a non-empty label")),
            ),
            Self::Forward(_) | Self::Credit(_) => Ok(()),
        }
    }

    /// Returns true for credit states.
    #[must_use]
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Credit(_))
    }
}

impl fmt::Display for LatentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Funding => write!(f, "Funding"),
            Self::Forward(index) => write!(f, "Forward({index})"),
            Self::Credit(reference) => write!(f, "Credit({reference})"),
        }
    }
}

/// What the spline response of a latent state represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantificationMetric {
    /// `R(t) = P(t)`.
    DiscountFactor,
    /// `P(t) = exp(-R(t) · (t - t_0))`.
    ZeroRate,
    /// `P(t) = exp(-∫_{t_0}^t R(s) ds)`.
    ForwardRate,
    /// `R(t) = Q(t)`, credit states only.
    SurvivalProbability,
}

impl QuantificationMetric {
    /// Response value pinned at the curve origin, if the metric has one.
    #[must_use]
    pub fn anchor(self) -> Option<f64> {
        match self {
            Self::DiscountFactor | Self::SurvivalProbability => Some(1.0),
            Self::ZeroRate | Self::ForwardRate => None,
        }
    }

    /// Starting point of the repricing solve for the first segment.
    #[must_use]
    pub fn initial_guess(self) -> f64 {
        self.anchor().unwrap_or(0.0)
    }

    /// Checks the metric can quantify `state`.
    pub fn check_state(self, state: &LatentState) -> CurveResult<()> {
        let compatible = match self {
            Self::DiscountFactor => !state.is_credit(),
            Self::SurvivalProbability => state.is_credit(),
            Self::ZeroRate | Self::ForwardRate => true,
        };
        if compatible {
            Ok(())
        } else {
            Err(CurveError::IncompatibleMetric {
                expected: format!("a metric for {state}"),
                got: self.to_string(),
            })
        }
    }
}

impl fmt::Display for QuantificationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DiscountFactor => "DiscountFactor",
            Self::ZeroRate => "ZeroRate",
            Self::ForwardRate => "ForwardRate",
            Self::SurvivalProbability => "SurvivalProbability",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_labels_rejected() {
        assert!(LatentState::forward("SOFR").validate().is_ok());
        assert!(LatentState::forward("  ").validate().is_err());
        assert!(LatentState::credit("").validate().is_err());
        assert!(LatentState::Funding.validate().is_ok());
    }

    #[test]
    fn test_metric_compatibility() {
        let credit = LatentState::credit("ACME");

        assert!(QuantificationMetric::SurvivalProbability.check_state(&credit).is_ok());
        assert!(QuantificationMetric::DiscountFactor.check_state(&credit).is_err());
        assert!(QuantificationMetric::SurvivalProbability
            .check_state(&LatentState::Funding)
            .is_err());
        assert!(QuantificationMetric::ZeroRate.check_state(&credit).is_ok());
    }

    #[test]
    fn test_anchor() {
        assert_eq!(QuantificationMetric::DiscountFactor.anchor(), Some(1.0));
        assert_eq!(QuantificationMetric::ForwardRate.anchor(), None);
        assert_eq!(QuantificationMetric::ZeroRate.initial_guess(), 0.0);
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&LatentState::forward("EURIBOR3M")).unwrap();
        let back: LatentState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LatentState::forward("EURIBOR3M"));
    }
}
