//! Curve views over calibrated spline segments.
//!
//! [`LatentCurve`] turns a spline response into the quantities pricing
//! needs (factors, zero and forward rates) according to the curve's
//! [`QuantificationMetric`]. [`CalibratedCurve`] is the immutable result of
//! calibration; [`TrialCurve`] is the view the bootstrap prices against
//! while one segment is still being solved.

use crate::error::{CurveError, CurveResult};
use crate::latent_state::{LatentState, QuantificationMetric};
use crate::repricing::RepricingReport;
use knotwork_math::quadrature::boole_nodes;
use knotwork_spline::prelude::*;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Boole panels per knot interval when integrating forward rates.
const INTEGRATION_PANELS: usize = 4;

/// A spread applied to the factor over `[start, end]`, e.g. a year-end turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnAdjustment {
    start: f64,
    end: f64,
    spread: f64,
}

impl TurnAdjustment {
    /// Creates a turn over `[start, end]` with a continuously compounded
    /// `spread`.
    pub fn new(start: f64, end: f64, spread: f64) -> CurveResult<Self> {
        if !start.is_finite() || !end.is_finite() || !spread.is_finite() {
            return Err(CurveError::invalid_input("Turn adjustment must be finite"));
        }
        if end <= start {
            return Err(CurveError::invalid_input(format!(
                "Turn adjustment needs start < end, got [{start}, {end}]"
            )));
        }
        Ok(Self { start, end, spread })
    }

    /// Start of the turn.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End of the turn.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Spread over the turn.
    #[must_use]
    pub fn spread(&self) -> f64 {
        self.spread
    }

    /// Length of `[origin, t] ∩ [start, end]`.
    #[must_use]
    pub fn overlap(&self, origin: f64, t: f64) -> f64 {
        (t.min(self.end) - origin.max(self.start)).max(0.0)
    }
}

/// A latent-state curve backed by a spline response.
pub trait LatentCurve: Send + Sync {
    /// State this curve quantifies.
    fn latent_state(&self) -> &LatentState;

    /// What the response represents.
    fn metric(&self) -> QuantificationMetric;

    /// Valuation ordinate, where factors equal one.
    fn origin(&self) -> f64;

    /// Turn adjustments applied on top of the spline.
    fn turns(&self) -> &[TurnAdjustment];

    /// Spline response at `t`.
    fn response_value(&self, t: f64) -> CurveResult<f64>;

    /// Segment edges in increasing order.
    fn knots(&self) -> Vec<f64>;

    /// `∫_a^b R(s) ds`, split at the knots.
    fn response_integral(&self, a: f64, b: f64) -> CurveResult<f64> {
        if b <= a {
            return Ok(0.0);
        }
        let mut edges = vec![a];
        edges.extend(self.knots().into_iter().filter(|k| *k > a && *k < b));
        edges.push(b);

        let mut total = 0.0;
        for piece in edges.windows(2) {
            for (s, w) in boole_nodes(piece[0], piece[1], INTEGRATION_PANELS)? {
                total += w * self.response_value(s)?;
            }
        }
        Ok(total)
    }

    /// Discount factor (funding, forward) or survival probability (credit)
    /// from the origin to `t`, turns included.
    fn factor(&self, t: f64) -> CurveResult<f64> {
        let origin = self.origin();
        let base = match self.metric() {
            QuantificationMetric::DiscountFactor | QuantificationMetric::SurvivalProbability => {
                self.response_value(t)?
            }
            QuantificationMetric::ZeroRate => {
                let rate = self.response_value(t)?;
                (-rate * (t - origin)).exp()
            }
            QuantificationMetric::ForwardRate => {
                self.response_value(t)?;
                (-self.response_integral(origin, t)?).exp()
            }
        };
        let turn: f64 = self
            .turns()
            .iter()
            .map(|turn| turn.spread * turn.overlap(origin, t))
            .sum();
        Ok(base * (-turn).exp())
    }

    /// Alias of [`factor`](LatentCurve::factor) for funding curves.
    fn discount_factor(&self, t: f64) -> CurveResult<f64> {
        self.factor(t)
    }

    /// Continuously compounded zero rate to `t`, `t` after the origin.
    fn zero_rate(&self, t: f64) -> CurveResult<f64> {
        let tenor = t - self.origin();
        if tenor <= 0.0 {
            return Err(CurveError::invalid_input(format!(
                "Zero rate needs t after the origin {}, got {t}",
                self.origin()
            )));
        }
        Ok(-self.factor(t)?.ln() / tenor)
    }

    /// Simple forward rate over `[start, end]`.
    fn forward_rate(&self, start: f64, end: f64) -> CurveResult<f64> {
        if end <= start {
            return Err(CurveError::invalid_input(format!(
                "Forward period needs start < end, got [{start}, {end}]"
            )));
        }
        Ok((self.factor(start)? / self.factor(end)? - 1.0) / (end - start))
    }
}

/// An immutable calibrated curve: one span of stretches plus metadata.
#[derive(Debug, Clone)]
pub struct CalibratedCurve {
    state: LatentState,
    metric: QuantificationMetric,
    origin: f64,
    span: Span,
    turns: Vec<TurnAdjustment>,
    report: Option<RepricingReport>,
}

impl CalibratedCurve {
    /// Wraps a span whose domain starts at `origin`.
    pub fn new(
        state: LatentState,
        metric: QuantificationMetric,
        origin: f64,
        span: Span,
        turns: Vec<TurnAdjustment>,
    ) -> CurveResult<Self> {
        state.validate()?;
        metric.check_state(&state)?;
        let Some((left, _)) = span.domain() else {
            return Err(CurveError::invalid_input("Curve span has no stretches"));
        };
        if left != origin {
            return Err(CurveError::invalid_input(format!(
                "Curve span starts at {left}, not at the origin {origin}"
            )));
        }
        Ok(Self {
            state,
            metric,
            origin,
            span,
            turns,
            report: None,
        })
    }

    pub(crate) fn with_report(mut self, report: RepricingReport) -> Self {
        self.report = Some(report);
        self
    }

    /// Underlying span.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Stretches in calibration order.
    #[must_use]
    pub fn stretches(&self) -> &[Stretch] {
        self.span.stretches()
    }

    /// Looks a stretch up by name.
    pub fn stretch(&self, name: &str) -> CurveResult<&Stretch> {
        self.span
            .stretch(name)
            .ok_or_else(|| CurveError::invalid_input(format!("No stretch named '{name}'")))
    }

    /// Repricing report of the calibration that produced this curve. Smoothed
    /// curves carry none.
    #[must_use]
    pub fn repricing_report(&self) -> Option<&RepricingReport> {
        self.report.as_ref()
    }

    /// Covered range.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        self.span.domain().unwrap_or((self.origin, self.origin))
    }

    /// `d R(t) / d input` of the stretch covering `t`, for curves whose
    /// stretches were set up with input Jacobians.
    pub fn stretch_input_jacobian(&self, t: f64) -> CurveResult<DVector<f64>> {
        Ok(self.span.containing_stretch(t)?.jacobian_d_response_d_input(t)?)
    }

    /// `R^{(order)}(t)`.
    pub fn response_value_derivative(&self, t: f64, order: usize) -> CurveResult<f64> {
        Ok(self.span.response_value_derivative(t, order)?)
    }

    /// Survival probability, credit curves only.
    pub fn survival_probability(&self, t: f64) -> CurveResult<f64> {
        if !self.state.is_credit() {
            return Err(CurveError::IncompatibleMetric {
                expected: "a credit curve".to_string(),
                got: self.state.to_string(),
            });
        }
        self.factor(t)
    }
}

impl LatentCurve for CalibratedCurve {
    fn latent_state(&self) -> &LatentState {
        &self.state
    }

    fn metric(&self) -> QuantificationMetric {
        self.metric
    }

    fn origin(&self) -> f64 {
        self.origin
    }

    fn turns(&self) -> &[TurnAdjustment] {
        &self.turns
    }

    fn response_value(&self, t: f64) -> CurveResult<f64> {
        Ok(self.span.response_value(t)?)
    }

    fn knots(&self) -> Vec<f64> {
        let mut knots: Vec<f64> = Vec::new();
        for stretch in self.span.stretches() {
            for knot in stretch.knots() {
                if knots.last().map_or(true, |last| knot > *last) {
                    knots.push(knot);
                }
            }
        }
        knots
    }
}

/// Calibrated segments followed by the segment being solved.
///
/// At a shared knot the left segment answers, matching [`Stretch`] and
/// [`Span`] evaluation, so prices seen during the solve are bit-identical
/// to prices on the finished curve.
#[derive(Debug, Clone, Copy)]
pub struct TrialCurve<'a> {
    state: &'a LatentState,
    metric: QuantificationMetric,
    origin: f64,
    turns: &'a [TurnAdjustment],
    calibrated: &'a [Segment],
    trial: &'a Segment,
}

impl<'a> TrialCurve<'a> {
    /// Creates a view; `trial` must start where `calibrated` ends.
    pub fn new(
        state: &'a LatentState,
        metric: QuantificationMetric,
        origin: f64,
        turns: &'a [TurnAdjustment],
        calibrated: &'a [Segment],
        trial: &'a Segment,
    ) -> CurveResult<Self> {
        let expected_left = calibrated.last().map_or(origin, Segment::right);
        if trial.left() != expected_left {
            return Err(CurveError::invalid_input(format!(
                "Trial segment starts at {} instead of {expected_left}",
                trial.left()
            )));
        }
        Ok(Self {
            state,
            metric,
            origin,
            turns,
            calibrated,
            trial,
        })
    }
}

impl LatentCurve for TrialCurve<'_> {
    fn latent_state(&self) -> &LatentState {
        self.state
    }

    fn metric(&self) -> QuantificationMetric {
        self.metric
    }

    fn origin(&self) -> f64 {
        self.origin
    }

    fn turns(&self) -> &[TurnAdjustment] {
        self.turns
    }

    fn response_value(&self, t: f64) -> CurveResult<f64> {
        if t > self.trial.left() || self.calibrated.is_empty() {
            return Ok(self.trial.response_value(t)?);
        }
        let index = self
            .calibrated
            .partition_point(|s| s.right() < t)
            .min(self.calibrated.len() - 1);
        Ok(self.calibrated[index].response_value(t)?)
    }

    fn knots(&self) -> Vec<f64> {
        std::iter::once(self.origin)
            .chain(self.calibrated.iter().map(Segment::right))
            .chain(std::iter::once(self.trial.right()))
            .collect()
    }
}
