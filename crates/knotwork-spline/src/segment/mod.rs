//! A single calibratable spline segment.
//!
//! A segment covers `[left, right]` and carries a coefficient frame
//! `(origin, width)`: the response is `Σ c_k b_k(u)` (times an optional
//! shape function) with `u = (x - origin) / width`. The frame starts equal
//! to the domain; clipping and knot insertion shrink the domain but keep the
//! frame, so the response of a clipped or split segment is bit-identical to
//! the original's.

mod constraint;
mod control;

pub use constraint::{
    ConstraintTerm, PredictorResponseDerivative, SegmentBestFitResponse, SegmentConstraint,
};
pub use control::{FlexurePenaltyControl, SegmentCustomBuilderControl, SegmentInelasticDesignControl};

use crate::basis::{BasisSet, ShapeControl};
use crate::calibration::{self, Objective};
use crate::error::{SplineError, SplineResult};
use knotwork_math::quadrature::boole_nodes;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boole panels used for penalty integrals.
const PENALTY_PANELS: usize = 8;

/// Derivative probes strictly inside a segment for monotonicity analysis.
const MONOTONE_PROBES: usize = 100;

/// Shape of a segment's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonotoneType {
    /// First derivative non-negative and not identically zero.
    Increasing,
    /// First derivative non-positive and not identically zero.
    Decreasing,
    /// First derivative identically zero.
    Flat,
    /// Decreasing then increasing.
    Minimum,
    /// Increasing then decreasing.
    Maximum,
    /// More than one change of direction.
    NonMonotone,
}

impl MonotoneType {
    /// Increasing, decreasing or flat.
    #[must_use]
    pub fn is_monotone(self) -> bool {
        matches!(self, Self::Increasing | Self::Decreasing | Self::Flat)
    }

    /// A single interior minimum or maximum.
    #[must_use]
    pub fn is_locally_extremal(self) -> bool {
        matches!(self, Self::Minimum | Self::Maximum)
    }
}

impl fmt::Display for MonotoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Increasing => "monotone-increasing",
            Self::Decreasing => "monotone-decreasing",
            Self::Flat => "flat",
            Self::Minimum => "locally-minimal",
            Self::Maximum => "locally-maximal",
            Self::NonMonotone => "non-monotone",
        };
        f.write_str(label)
    }
}

/// One spline piece over `[left, right]`.
#[derive(Debug, Clone)]
pub struct Segment {
    left: f64,
    right: f64,
    origin: f64,
    width: f64,
    basis: BasisSet,
    shape: Option<ShapeControl>,
    inelastic: SegmentInelasticDesignControl,
    coefficients: Option<DVector<f64>>,
    sensitivity: Option<DMatrix<f64>>,
}

impl Segment {
    /// Creates an uncalibrated segment.
    pub fn new(left: f64, right: f64, control: &SegmentCustomBuilderControl) -> SplineResult<Self> {
        if !left.is_finite() || !right.is_finite() {
            return Err(SplineError::invalid_input(format!(
                "Segment edges must be finite, got [{left}, {right}]"
            )));
        }
        if left >= right {
            return Err(SplineError::NonMonotonicInput {
                index: 1,
                previous: left,
                current: right,
            });
        }
        let basis = control.validate()?;

        Ok(Self {
            left,
            right,
            origin: left,
            width: right - left,
            basis,
            shape: control.shape,
            inelastic: control.inelastic,
            coefficients: None,
            sensitivity: None,
        })
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.left
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.right
    }

    /// Basis evaluator.
    #[must_use]
    pub fn basis(&self) -> &BasisSet {
        &self.basis
    }

    /// Shape controller, if any.
    #[must_use]
    pub fn shape(&self) -> Option<&ShapeControl> {
        self.shape.as_ref()
    }

    /// Continuity and penalty settings.
    #[must_use]
    pub fn inelastic(&self) -> &SegmentInelasticDesignControl {
        &self.inelastic
    }

    /// Number of coefficients.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.basis.dimension()
    }

    /// Calibrated coefficients.
    #[must_use]
    pub fn coefficients(&self) -> Option<&DVector<f64>> {
        self.coefficients.as_ref()
    }

    /// `d coefficient / d constraint value` from the last local calibration,
    /// one column per constraint row.
    #[must_use]
    pub fn constraint_sensitivity(&self) -> Option<&DMatrix<f64>> {
        self.sensitivity.as_ref()
    }

    /// Returns true once coefficients are set.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Returns true if `x` lies in `[left, right]`.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.left && x <= self.right
    }

    fn normalize(&self, x: f64) -> f64 {
        (x - self.origin) / self.width
    }

    fn check_domain(&self, x: f64) -> SplineResult<()> {
        if self.contains(x) {
            Ok(())
        } else {
            Err(SplineError::domain(x, self.left, self.right))
        }
    }

    fn require_coefficients(&self) -> SplineResult<&DVector<f64>> {
        self.coefficients.as_ref().ok_or_else(|| SplineError::Uncalibrated {
            name: format!("segment [{}, {}]", self.left, self.right),
        })
    }

    /// Basis row of the `order`-th `x`-derivative at `x`.
    pub fn basis_row(&self, x: f64, order: usize) -> SplineResult<DVector<f64>> {
        self.check_domain(x)?;
        Ok(self.row_unchecked(x, order))
    }

    fn row_unchecked(&self, x: f64, order: usize) -> DVector<f64> {
        let row = self
            .basis
            .shaped_row(self.shape.as_ref(), self.normalize(x), order);
        if order == 0 {
            row
        } else {
            row / self.width.powi(order as i32)
        }
    }

    /// Response at `x`.
    pub fn response_value(&self, x: f64) -> SplineResult<f64> {
        self.response_value_derivative(x, 0)
    }

    /// `order`-th derivative of the response at `x`.
    pub fn response_value_derivative(&self, x: f64, order: usize) -> SplineResult<f64> {
        let coefficients = self.require_coefficients()?;
        Ok(self.basis_row(x, order)?.dot(coefficients))
    }

    /// `d R(x) / d c`, the basis row at `x`.
    pub fn jacobian_d_response_d_coefficient(&self, x: f64) -> SplineResult<DVector<f64>> {
        self.basis_row(x, 0)
    }

    /// Constraint row `Σ w_j · row(x_j, p_j)`.
    pub(crate) fn constraint_row(&self, constraint: &SegmentConstraint) -> SplineResult<DVector<f64>> {
        constraint.check_finite()?;
        let mut row = DVector::zeros(self.dimension());
        for term in constraint.terms() {
            row += self.basis_row(term.ordinate, term.derivative_order)? * term.weight;
        }
        Ok(row)
    }

    /// `∫ r_p(u) r_p(u)ᵀ du` over the segment domain, `r_p` the basis row of
    /// the `p`-th `u`-derivative.
    pub(crate) fn penalty_matrix(&self, order: usize) -> SplineResult<DMatrix<f64>> {
        let n = self.dimension();
        let mut penalty = DMatrix::zeros(n, n);
        let nodes = boole_nodes(
            self.normalize(self.left),
            self.normalize(self.right),
            PENALTY_PANELS,
        )?;
        for (u, weight) in nodes {
            let row = self.basis.shaped_row(self.shape.as_ref(), u, order);
            penalty += &row * row.transpose() * weight;
        }
        Ok(penalty)
    }

    /// Adds this segment's best-fit residuals and roughness penalties to an
    /// objective at coefficient offset `offset`.
    pub(crate) fn add_objective_terms(
        &self,
        objective: &mut Objective,
        offset: usize,
        best_fit: Option<&SegmentBestFitResponse>,
    ) -> SplineResult<()> {
        if let Some(best_fit) = best_fit {
            for (x, y, w) in best_fit.points() {
                objective.add_residual(offset, &self.basis_row(x, 0)?, y, w);
            }
        }
        for penalty in [self.inelastic.curvature, self.inelastic.length] {
            if penalty.is_active() {
                objective.add_penalty(
                    offset,
                    &self.penalty_matrix(penalty.derivative_order)?,
                    penalty.amplitude,
                );
            }
        }
        Ok(())
    }

    /// Returns true if calibration minimizes an objective rather than
    /// solving a square system.
    pub(crate) fn needs_objective(&self, best_fit: Option<&SegmentBestFitResponse>) -> bool {
        best_fit.is_some() || self.inelastic.has_penalty()
    }

    /// Calibrates the coefficients to `constraints`, optionally fitting
    /// `best_fit` in least squares.
    ///
    /// Without best-fit targets or active penalties the constraint count
    /// must equal the basis dimension. On failure the segment is unchanged.
    pub fn calibrate(
        &mut self,
        constraints: &[SegmentConstraint],
        best_fit: Option<&SegmentBestFitResponse>,
    ) -> SplineResult<()> {
        let n = self.dimension();
        let mut rows = DMatrix::zeros(constraints.len(), n);
        let mut values = DVector::zeros(constraints.len());
        for (r, constraint) in constraints.iter().enumerate() {
            rows.set_row(r, &self.constraint_row(constraint)?.transpose());
            values[r] = constraint.value();
        }

        let objective = if self.needs_objective(best_fit) {
            let mut objective = Objective::zeros(n);
            self.add_objective_terms(&mut objective, 0, best_fit)?;
            Some(objective)
        } else {
            None
        };

        let solved = calibration::solve(&rows, &values, objective.as_ref())?;
        self.coefficients = Some(solved.coefficients);
        self.sensitivity = Some(solved.sensitivity);
        Ok(())
    }

    /// Sets coefficients computed elsewhere (global stretch setup).
    pub fn set_coefficients(&mut self, coefficients: DVector<f64>) -> SplineResult<()> {
        if coefficients.len() != self.dimension() {
            return Err(SplineError::invalid_input(format!(
                "Expected {} coefficients, got {}",
                self.dimension(),
                coefficients.len()
            )));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SplineError::singular("non-finite coefficients"));
        }
        self.coefficients = Some(coefficients);
        self.sensitivity = None;
        Ok(())
    }

    /// `∫ (R^{(p)}(u))² du` over the domain for the penalty's derivative order.
    fn penalty_energy(&self, order: usize) -> SplineResult<f64> {
        let coefficients = self.require_coefficients()?;
        let penalty = self.penalty_matrix(order)?;
        Ok(coefficients.dot(&(&penalty * coefficients)))
    }

    /// Curvature penalty energy in the normalized coordinate.
    pub fn curvature_dpe(&self) -> SplineResult<f64> {
        self.penalty_energy(self.inelastic.curvature.derivative_order)
    }

    /// Length penalty energy in the normalized coordinate.
    pub fn length_dpe(&self) -> SplineResult<f64> {
        self.penalty_energy(self.inelastic.length.derivative_order)
    }

    /// Weighted squared residual against best-fit targets inside the segment.
    pub fn best_fit_dpe(&self, best_fit: &SegmentBestFitResponse) -> SplineResult<f64> {
        let mut energy = 0.0;
        for (x, y, w) in best_fit.points() {
            let residual = self.response_value(x)? - y;
            energy += w * residual * residual;
        }
        Ok(energy)
    }

    /// Classifies the response from the sign of its first derivative at both
    /// edges and interior probes.
    pub fn monotone_type(&self) -> SplineResult<MonotoneType> {
        let coefficients = self.require_coefficients()?;
        let step = (self.right - self.left) / (MONOTONE_PROBES + 1) as f64;
        let derivatives: Vec<f64> = (0..=MONOTONE_PROBES + 1)
            .map(|i| {
                let x = if i == MONOTONE_PROBES + 1 {
                    self.right
                } else {
                    self.left + step * i as f64
                };
                self.row_unchecked(x, 1).dot(coefficients)
            })
            .collect();

        // Coefficient noise on a constant response must still read as flat
        let level = coefficients.amax() / (self.right - self.left);
        Ok(classify_slopes(&derivatives, level))
    }

    /// Same segment restricted to `[left, right]`. A calibrated segment keeps
    /// its coefficients and frame; an uncalibrated one is re-framed.
    pub(crate) fn restricted(&self, left: f64, right: f64) -> SplineResult<Self> {
        if left < self.left || right > self.right || left >= right {
            return Err(SplineError::invalid_input(format!(
                "Cannot restrict [{}, {}] to [{left}, {right}]",
                self.left, self.right
            )));
        }
        let mut segment = self.clone();
        segment.left = left;
        segment.right = right;
        if !segment.is_calibrated() {
            segment.origin = left;
            segment.width = right - left;
        }
        Ok(segment)
    }
}

fn classify_slopes(derivatives: &[f64], level: f64) -> MonotoneType {
    let scale = derivatives.iter().fold(level, |m, d| m.max(d.abs()));
    if scale == 0.0 {
        return MonotoneType::Flat;
    }
    let eps = 1e-10 * scale;

    let signs: Vec<i8> = derivatives
        .iter()
        .filter(|d| d.abs() > eps)
        .map(|d| if *d > 0.0 { 1 } else { -1 })
        .collect();

    let Some(&first) = signs.first() else {
        return MonotoneType::Flat;
    };
    let changes = signs.windows(2).filter(|w| w[0] != w[1]).count();

    match (changes, first) {
        (0, 1) => MonotoneType::Increasing,
        (0, _) => MonotoneType::Decreasing,
        (1, -1) => MonotoneType::Minimum,
        (1, _) => MonotoneType::Maximum,
        _ => MonotoneType::NonMonotone,
    }
}
