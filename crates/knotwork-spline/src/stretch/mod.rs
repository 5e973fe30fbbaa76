//! Multi-segment sequences ("stretches").
//!
//! A stretch is an ordered chain of contiguous segments spanning
//! `[x_0, x_n]`. It is created uncalibrated from predictor ordinates and
//! per-segment controls, then calibrated in place by one of three setups:
//!
//! - [`Stretch::setup_hermite`]: purely local, each segment from its edge
//!   states
//! - [`Stretch::setup`]: one joint system with continuity at interior knots
//!   and [`BoundarySettings`] at the ends
//! - [`Stretch::setup_best_fit`]: the joint system driven by a weighted
//!   regression onto [`StretchBestFitResponse`] targets
//!
//! A failed setup leaves the stretch exactly as it was.

mod boundary;
mod setup;

pub use boundary::{BoundarySettings, StretchBestFitResponse};

use crate::error::{SplineError, SplineResult};
use crate::segment::{MonotoneType, Segment, SegmentCustomBuilderControl};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Whether setup also computes the response Jacobian to the setup inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationDetail {
    /// Coefficients only.
    #[default]
    Calibrate,
    /// Coefficients and `d response / d input`.
    CalibrateJacobian,
}

/// Lifecycle of a stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StretchState {
    /// Geometry only.
    Uncalibrated,
    /// Every segment has coefficients.
    Calibrated,
    /// Calibrated, with the input Jacobian available.
    JacobianComputed,
}

/// An ordered chain of contiguous segments.
#[derive(Debug, Clone)]
pub struct Stretch {
    name: String,
    segments: Vec<Segment>,
    detail: CalibrationDetail,
    state: StretchState,
    /// Per segment: `d coefficient / d input`, dimension × inputs.
    input_jacobian: Option<Vec<DMatrix<f64>>>,
}

impl Stretch {
    /// Creates an uncalibrated stretch over `ordinates` with one control per
    /// segment.
    pub fn new(
        name: impl Into<String>,
        ordinates: &[f64],
        controls: &[SegmentCustomBuilderControl],
        detail: CalibrationDetail,
    ) -> SplineResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SplineError::invalid_input("Stretch name must not be empty"));
        }
        validate_ordinates(ordinates)?;
        if controls.len() + 1 != ordinates.len() {
            return Err(SplineError::invalid_input(format!(
                "{} ordinates need {} segment controls, got {}",
                ordinates.len(),
                ordinates.len() - 1,
                controls.len()
            )));
        }

        let segments = ordinates
            .windows(2)
            .zip(controls)
            .map(|(edge, control)| Segment::new(edge[0], edge[1], control))
            .collect::<SplineResult<Vec<_>>>()?;

        Ok(Self {
            name,
            segments,
            detail,
            state: StretchState::Uncalibrated,
            input_jacobian: None,
        })
    }

    /// Creates an uncalibrated stretch using the same control for every
    /// segment.
    pub fn with_uniform_control(
        name: impl Into<String>,
        ordinates: &[f64],
        control: &SegmentCustomBuilderControl,
        detail: CalibrationDetail,
    ) -> SplineResult<Self> {
        let controls = vec![*control; ordinates.len().saturating_sub(1)];
        Self::new(name, ordinates, &controls, detail)
    }

    /// Assembles a calibrated stretch from segments calibrated elsewhere.
    pub fn from_calibrated_segments(
        name: impl Into<String>,
        segments: Vec<Segment>,
    ) -> SplineResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SplineError::invalid_input("Stretch name must not be empty"));
        }
        if segments.is_empty() {
            return Err(SplineError::invalid_input("Stretch needs at least one segment"));
        }
        for (i, pair) in segments.windows(2).enumerate() {
            if pair[0].right() != pair[1].left() {
                return Err(SplineError::invalid_input(format!(
                    "Segments {i} and {} are not contiguous: {} != {}",
                    i + 1,
                    pair[0].right(),
                    pair[1].left()
                )));
            }
        }
        if segments.iter().any(|s| !s.is_calibrated()) {
            return Err(SplineError::Uncalibrated { name });
        }

        Ok(Self {
            name,
            segments,
            detail: CalibrationDetail::Calibrate,
            state: StretchState::Calibrated,
            input_jacobian: None,
        })
    }

    /// Stretch name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Calibration detail requested at construction.
    #[must_use]
    pub fn detail(&self) -> CalibrationDetail {
        self.detail
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> StretchState {
        self.state
    }

    /// Returns true once a setup has succeeded.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.state != StretchState::Uncalibrated
    }

    /// `(x_0, x_n)`.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        (self.left(), self.right())
    }

    /// Left edge of the first segment.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.segments[0].left()
    }

    /// Right edge of the last segment.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.segments[self.segments.len() - 1].right()
    }

    /// All knots `x_0..=x_n`.
    #[must_use]
    pub fn knots(&self) -> Vec<f64> {
        std::iter::once(self.left())
            .chain(self.segments.iter().map(Segment::right))
            .collect()
    }

    /// Returns true if `x` lies in the stretch domain.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.left() && x <= self.right()
    }

    fn require_calibrated(&self) -> SplineResult<()> {
        if self.is_calibrated() {
            Ok(())
        } else {
            Err(SplineError::Uncalibrated {
                name: self.name.clone(),
            })
        }
    }

    /// Index of the segment containing `x`.
    ///
    /// Segment `i` matches when `x` lies in `[left, right]` with each edge
    /// included only if the corresponding flag is set; the first match wins.
    pub fn containing_index(&self, x: f64, include_left: bool, include_right: bool) -> SplineResult<usize> {
        let (left, right) = self.domain();
        if !x.is_finite() || x < left || x > right {
            return Err(SplineError::domain(x, left, right));
        }

        let start = self.segments.partition_point(|s| s.right() < x);
        self.segments[start..]
            .iter()
            .take(2)
            .position(|s| {
                let after_left = if include_left { x >= s.left() } else { x > s.left() };
                let before_right = if include_right { x <= s.right() } else { x < s.right() };
                after_left && before_right
            })
            .map(|offset| start + offset)
            .ok_or_else(|| SplineError::domain(x, left, right))
    }

    /// Response at `x`; at an interior knot the left segment answers.
    pub fn response_value(&self, x: f64) -> SplineResult<f64> {
        self.response_value_derivative(x, 0)
    }

    /// `order`-th derivative of the response at `x`.
    pub fn response_value_derivative(&self, x: f64, order: usize) -> SplineResult<f64> {
        self.require_calibrated()?;
        let index = self.containing_index(x, true, true)?;
        self.segments[index].response_value_derivative(x, order)
    }

    /// `d R(x) / d input`, where the inputs are the knot responses of a
    /// Hermite setup, or the leading and state constraint values of a global
    /// setup.
    pub fn jacobian_d_response_d_input(&self, x: f64) -> SplineResult<DVector<f64>> {
        self.require_calibrated()?;
        let jacobian = self.input_jacobian.as_ref().ok_or_else(|| {
            SplineError::invalid_input(format!(
                "Stretch '{}' was calibrated without an input Jacobian",
                self.name
            ))
        })?;
        let index = self.containing_index(x, true, true)?;
        let row = self.segments[index].jacobian_d_response_d_coefficient(x)?;
        Ok(jacobian[index].transpose() * row)
    }

    /// Monotonicity of the segment containing `x`.
    pub fn monotone_type(&self, x: f64) -> SplineResult<MonotoneType> {
        self.require_calibrated()?;
        let index = self.containing_index(x, true, true)?;
        self.segments[index].monotone_type()
    }

    /// Curvature penalty energy summed over segments.
    pub fn curvature_dpe(&self) -> SplineResult<f64> {
        self.require_calibrated()?;
        self.segments.iter().map(Segment::curvature_dpe).sum()
    }

    /// Length penalty energy summed over segments.
    pub fn length_dpe(&self) -> SplineResult<f64> {
        self.require_calibrated()?;
        self.segments.iter().map(Segment::length_dpe).sum()
    }

    /// Weighted squared residual against best-fit targets.
    pub fn best_fit_dpe(&self, best_fit: &StretchBestFitResponse) -> SplineResult<f64> {
        self.require_calibrated()?;
        let mut energy = 0.0;
        for (x, y, w) in best_fit.points() {
            let residual = self.response_value(x)? - y;
            energy += w * residual * residual;
        }
        Ok(energy)
    }

    /// New stretch restricted to `[x, x_n]`.
    ///
    /// The segment straddling `x` keeps its basis, coefficients and frame,
    /// so responses right of `x` are unchanged.
    pub fn clip_left(&self, name: impl Into<String>, x: f64) -> SplineResult<Self> {
        self.require_calibrated()?;
        if x == self.right() {
            return Err(SplineError::invalid_input(format!(
                "Clipping '{}' left of its right edge {x} leaves nothing",
                self.name
            )));
        }
        let index = self.containing_index(x, true, false)?;

        let mut segments = Vec::with_capacity(self.segments.len() - index);
        let straddling = &self.segments[index];
        segments.push(if x > straddling.left() {
            straddling.restricted(x, straddling.right())?
        } else {
            straddling.clone()
        });
        segments.extend(self.segments[index + 1..].iter().cloned());

        self.derived(name, segments, |jacobian| jacobian[index..].to_vec())
    }

    /// New stretch restricted to `[x_0, x]`.
    pub fn clip_right(&self, name: impl Into<String>, x: f64) -> SplineResult<Self> {
        self.require_calibrated()?;
        if x == self.left() {
            return Err(SplineError::invalid_input(format!(
                "Clipping '{}' right of its left edge {x} leaves nothing",
                self.name
            )));
        }
        let index = self.containing_index(x, false, true)?;

        let mut segments: Vec<Segment> = self.segments[..index].to_vec();
        let straddling = &self.segments[index];
        segments.push(if x < straddling.right() {
            straddling.restricted(straddling.left(), x)?
        } else {
            straddling.clone()
        });

        self.derived(name, segments, |jacobian| jacobian[..=index].to_vec())
    }

    fn derived(
        &self,
        name: impl Into<String>,
        segments: Vec<Segment>,
        slice: impl FnOnce(&[DMatrix<f64>]) -> Vec<DMatrix<f64>>,
    ) -> SplineResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SplineError::invalid_input("Stretch name must not be empty"));
        }
        Ok(Self {
            name,
            segments,
            detail: self.detail,
            state: self.state,
            input_jacobian: self.input_jacobian.as_deref().map(slice),
        })
    }

    /// Splits the segment containing `x` at `x` without changing the
    /// response. `x` must lie strictly inside a segment.
    pub fn insert_knot(&mut self, x: f64) -> SplineResult<()> {
        let index = self.containing_index(x, false, false).map_err(|_| {
            SplineError::invalid_input(format!(
                "Knot {x} must lie strictly inside a segment of '{}'",
                self.name
            ))
        })?;

        let segment = &self.segments[index];
        let left_part = segment.restricted(segment.left(), x)?;
        let right_part = segment.restricted(x, segment.right())?;
        self.segments[index] = left_part;
        self.segments.insert(index + 1, right_part);

        if let Some(jacobian) = self.input_jacobian.as_mut() {
            let duplicate = jacobian[index].clone();
            jacobian.insert(index, duplicate);
        }
        Ok(())
    }

    fn finish(&mut self, segments: Vec<Segment>, jacobian: Option<Vec<DMatrix<f64>>>) {
        self.segments = segments;
        self.state = if jacobian.is_some() {
            StretchState::JacobianComputed
        } else {
            StretchState::Calibrated
        };
        self.input_jacobian = jacobian;
    }
}

pub(crate) fn validate_ordinates(ordinates: &[f64]) -> SplineResult<()> {
    if ordinates.len() < 2 {
        return Err(SplineError::invalid_input(format!(
            "A stretch needs at least 2 predictor ordinates, got {}",
            ordinates.len()
        )));
    }
    if let Some(x) = ordinates.iter().find(|x| !x.is_finite()) {
        return Err(SplineError::invalid_input(format!(
            "Predictor ordinate {x} is not finite"
        )));
    }
    for (i, pair) in ordinates.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(SplineError::NonMonotonicInput {
                index: i + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}
