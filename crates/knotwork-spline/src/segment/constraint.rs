//! Linear constraints and best-fit targets for segment calibration.

use crate::error::{SplineError, SplineResult};

/// One term `weight · R^{(derivative_order)}(ordinate)` of a constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintTerm {
    /// Predictor ordinate.
    pub ordinate: f64,
    /// Derivative order of the response.
    pub derivative_order: usize,
    /// Weight of the term.
    pub weight: f64,
}

/// Linear constraint `Σ_j w_j · R^{(p_j)}(x_j) = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConstraint {
    terms: Vec<ConstraintTerm>,
    value: f64,
}

impl SegmentConstraint {
    /// Creates a constraint from explicit terms.
    pub fn new(terms: Vec<ConstraintTerm>, value: f64) -> SplineResult<Self> {
        if terms.is_empty() {
            return Err(SplineError::invalid_input("Constraint needs at least one term"));
        }
        if !value.is_finite() {
            return Err(SplineError::invalid_input(format!(
                "Constraint value must be finite, got {value}"
            )));
        }
        if let Some(term) = terms
            .iter()
            .find(|t| !t.ordinate.is_finite() || !t.weight.is_finite())
        {
            return Err(SplineError::invalid_input(format!(
                "Constraint term is not finite: {term:?}"
            )));
        }
        Ok(Self { terms, value })
    }

    /// `R(ordinate) = value`.
    #[must_use]
    pub fn response(ordinate: f64, value: f64) -> Self {
        Self::derivative(ordinate, 0, value)
    }

    /// `R^{(order)}(ordinate) = value`.
    #[must_use]
    pub fn derivative(ordinate: f64, order: usize, value: f64) -> Self {
        Self {
            terms: vec![ConstraintTerm {
                ordinate,
                derivative_order: order,
                weight: 1.0,
            }],
            value,
        }
    }

    /// The constraint terms.
    #[must_use]
    pub fn terms(&self) -> &[ConstraintTerm] {
        &self.terms
    }

    /// Right-hand side.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Same terms, different right-hand side.
    #[must_use]
    pub fn with_value(&self, value: f64) -> Self {
        Self {
            terms: self.terms.clone(),
            value,
        }
    }

    pub(crate) fn check_finite(&self) -> SplineResult<()> {
        let finite = self.value.is_finite()
            && self
                .terms
                .iter()
                .all(|t| t.ordinate.is_finite() && t.weight.is_finite());
        if finite {
            Ok(())
        } else {
            Err(SplineError::invalid_input(format!(
                "Constraint is not finite: {self:?}"
            )))
        }
    }
}

/// Response value and derivatives at one predictor ordinate.
///
/// Used as the left or right edge state of a Hermite setup: the response
/// followed by the first, second, ... derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorResponseDerivative {
    /// Response value.
    pub response: f64,
    /// Derivatives of order 1, 2, ...
    pub derivatives: Vec<f64>,
}

impl PredictorResponseDerivative {
    /// Creates an edge state.
    #[must_use]
    pub fn new(response: f64, derivatives: Vec<f64>) -> Self {
        Self {
            response,
            derivatives,
        }
    }

    /// Edge state carrying only the response value.
    #[must_use]
    pub fn response_only(response: f64) -> Self {
        Self::new(response, Vec::new())
    }

    /// Expands the state into constraints at `ordinate`, response first.
    #[must_use]
    pub fn constraints_at(&self, ordinate: f64) -> Vec<SegmentConstraint> {
        std::iter::once(SegmentConstraint::response(ordinate, self.response))
            .chain(
                self.derivatives
                    .iter()
                    .enumerate()
                    .map(|(k, &d)| SegmentConstraint::derivative(ordinate, k + 1, d)),
            )
            .collect()
    }
}

/// Weighted response targets fitted in least squares.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentBestFitResponse {
    ordinates: Vec<f64>,
    responses: Vec<f64>,
    weights: Vec<f64>,
}

impl SegmentBestFitResponse {
    /// Creates a best-fit target set; `weights` defaults to all ones.
    pub fn new(ordinates: Vec<f64>, responses: Vec<f64>, weights: Option<Vec<f64>>) -> SplineResult<Self> {
        if ordinates.is_empty() {
            return Err(SplineError::invalid_input("Best-fit response needs at least one point"));
        }
        let weights = weights.unwrap_or_else(|| vec![1.0; ordinates.len()]);
        if ordinates.len() != responses.len() || ordinates.len() != weights.len() {
            return Err(SplineError::invalid_input(format!(
                "Best-fit arrays differ in length: {} ordinates, {} responses, {} weights",
                ordinates.len(),
                responses.len(),
                weights.len()
            )));
        }
        if ordinates.iter().chain(&responses).any(|v| !v.is_finite()) {
            return Err(SplineError::invalid_input("Best-fit points must be finite"));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SplineError::invalid_input(
                "Best-fit weights must be finite and non-negative",
            ));
        }
        Ok(Self {
            ordinates,
            responses,
            weights,
        })
    }

    /// Iterates `(ordinate, response, weight)` triples.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.ordinates
            .iter()
            .zip(&self.responses)
            .zip(&self.weights)
            .map(|((&x, &y), &w)| (x, y, w))
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordinates.len()
    }

    /// Always false: construction rejects empty sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordinates.is_empty()
    }

    /// Points in `[left, right)` (or `[left, right]` when `include_right`).
    pub(crate) fn restricted(&self, left: f64, right: f64, include_right: bool) -> Option<Self> {
        let mut ordinates = Vec::new();
        let mut responses = Vec::new();
        let mut weights = Vec::new();
        for (x, y, w) in self.points() {
            if x >= left && (x < right || (include_right && x == right)) {
                ordinates.push(x);
                responses.push(y);
                weights.push(w);
            }
        }
        if ordinates.is_empty() {
            None
        } else {
            Some(Self {
                ordinates,
                responses,
                weights,
            })
        }
    }
}
