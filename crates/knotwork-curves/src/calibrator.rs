//! Shape-preserving bootstrap of a latent-state curve.
//!
//! Instruments are calibrated one at a time. Each instrument owns the
//! segment ending at its maturity; the segment's linear constraints are the
//! metric anchor (first segment only), continuity with the previous segment
//! and the unknown right-edge response `y`. The constraints are linear, so
//! the segment coefficients are affine in `y`:
//!
//! ```text
//! c(y) = c(y0) + (y - y0) · ∂c/∂y
//! ```
//!
//! and the instrument quote is matched with a one-dimensional root search in
//! `y`, pricing off the segments calibrated so far plus the trial segment.

use crate::config::{CalibratorConfig, SmoothingSettings};
use crate::context::{MarketParams, PricingCurves, ValuationParams};
use crate::curve::{CalibratedCurve, LatentCurve, TrialCurve, TurnAdjustment};
use crate::error::{CurveError, CurveResult};
use crate::latent_state::{LatentState, QuantificationMetric};
use crate::measure::ManifestMeasure;
use crate::representation::StretchRepresentationSpec;
use crate::repricing::RepricingReport;
use knotwork_math::solvers::hybrid_numerical;
use knotwork_spline::segment::{Segment, SegmentConstraint};
use knotwork_spline::span::{Span, SpanResolution};
use knotwork_spline::stretch::{CalibrationDetail, Stretch, StretchBestFitResponse};
use knotwork_spline::SplineError;
use nalgebra::DVector;
use rayon::prelude::*;
use tracing::{debug, info};

/// Everything a trial curve needs besides its segments.
struct CurveFrame<'a> {
    state: &'a LatentState,
    metric: QuantificationMetric,
    origin: f64,
    turns: &'a [TurnAdjustment],
}

/// Bootstraps [`CalibratedCurve`]s from stretch representation specs.
///
/// # Example
///
/// ```rust
/// use knotwork_curves::prelude::*;
/// use std::sync::Arc;
///
/// let instruments: Vec<SharedInstrument> = vec![
///     Arc::new(Deposit::new("6M", 0.0, 0.5).unwrap()),
///     Arc::new(Deposit::new("1Y", 0.0, 1.0).unwrap()),
/// ];
/// let spec = StretchRepresentationSpec::new(
///     "money-market",
///     LatentState::Funding,
///     QuantificationMetric::DiscountFactor,
///     instruments,
///     vec![ManifestMeasure::Rate; 2],
///     vec![0.030, 0.032],
/// )
/// .unwrap();
///
/// let calibrator = LinearCurveCalibrator::default();
/// let curve = calibrator
///     .calibrate(&[spec], &ValuationParams::default(), &MarketParams::new())
///     .unwrap();
///
/// assert!(curve.repricing_report().unwrap().is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinearCurveCalibrator {
    config: CalibratorConfig,
}

impl LinearCurveCalibrator {
    /// Creates a calibrator with a validated configuration.
    pub fn new(config: CalibratorConfig) -> CurveResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Calibrator settings.
    #[must_use]
    pub fn config(&self) -> &CalibratorConfig {
        &self.config
    }

    /// Calibrates one curve, one stretch per spec, in spec order.
    ///
    /// # Errors
    ///
    /// Input validation errors (see [`validate_specs`]) before any work is
    /// done; `InstrumentCalibrationFailed` naming the stretch and
    /// instrument index when a quote cannot be matched; `CurveNotFound`
    /// when an instrument needs a market curve that is missing.
    pub fn calibrate(
        &self,
        specs: &[StretchRepresentationSpec],
        valuation: &ValuationParams,
        market: &MarketParams,
    ) -> CurveResult<CalibratedCurve> {
        let (state, metric) = validate_specs(specs, valuation)?;
        let origin = valuation.valuation_ordinate();
        let turns: Vec<TurnAdjustment> = specs
            .iter()
            .flat_map(|spec| spec.turns().iter().copied())
            .collect();
        let frame = CurveFrame {
            state,
            metric,
            origin,
            turns: &turns,
        };

        info!(
            state = %state,
            metric = %metric,
            stretches = specs.len(),
            instruments = specs.iter().map(StretchRepresentationSpec::len).sum::<usize>(),
            origin,
            "calibrating curve"
        );

        let mut calibrated: Vec<Segment> = Vec::new();
        let mut span = Span::new(SpanResolution::FirstInserted);
        for spec in specs {
            let first = calibrated.len();
            for index in 0..spec.len() {
                let segment = self.bootstrap_instrument(&frame, &calibrated, spec, index, market)?;
                calibrated.push(segment);
            }
            let stretch = Stretch::from_calibrated_segments(spec.name(), calibrated[first..].to_vec())?;
            debug!(
                stretch = spec.name(),
                segments = stretch.segment_count(),
                left = stretch.left(),
                right = stretch.right(),
                "stretch calibrated"
            );
            span.add_stretch(stretch)?;
        }

        let curve = CalibratedCurve::new(state.clone(), metric, origin, span, turns.clone())?;
        let report = RepricingReport::build(&curve, specs, market, self.config.repricing_tolerance)?;

        info!(
            state = %state,
            max_error = report.max_error(),
            rms_error = report.rms_error(),
            valid = report.is_valid(),
            "curve calibrated"
        );
        Ok(curve.with_report(report))
    }

    /// Solves the segment ending at instrument `index` of `spec`.
    fn bootstrap_instrument(
        &self,
        frame: &CurveFrame<'_>,
        calibrated: &[Segment],
        spec: &StretchRepresentationSpec,
        index: usize,
        market: &MarketParams,
    ) -> CurveResult<Segment> {
        let instrument = &spec.instruments()[index];
        let measure = spec.measures()[index];
        let quote = spec.quotes()[index];
        let failed = |reason: &dyn std::fmt::Display| CurveError::instrument_failed(spec.name(), index, reason);

        let left = calibrated.last().map_or(frame.origin, Segment::right);
        let right = instrument.maturity();
        let guess = match calibrated.last() {
            Some(previous) => previous.response_value(previous.right())?,
            None => frame.metric.initial_guess(),
        };

        let mut segment = Segment::new(left, right, &self.config.segment_control)?;
        let constraints = segment_constraints(frame, calibrated, &segment, guess)?;
        segment.calibrate(&constraints, None).map_err(|e| failed(&e))?;
        let (base, slope) = affine_response(&segment)?;

        let coefficients = |y: f64| &base + &slope * (y - guess);
        let price = |y: f64| -> CurveResult<f64> {
            let mut trial = segment.clone();
            trial.set_coefficients(coefficients(y))?;
            let curve = TrialCurve::new(
                frame.state,
                frame.metric,
                frame.origin,
                frame.turns,
                calibrated,
                &trial,
            )?;
            instrument.measure_value(measure, &PricingCurves::new(&curve, market))
        };

        // Structural problems (missing market curves) surface as themselves
        price(guess)?;

        let solved = hybrid_numerical(
            |y| price(y).map_or(f64::NAN, |model| model - quote),
            guess,
            None,
            &self.config.solver(),
        )
        .map_err(|e| failed(&e))?;
        // A bracket around a pole converges without matching the quote
        if !solved.residual.is_finite() || solved.residual.abs() > self.config.repricing_tolerance {
            return Err(failed(&format!(
                "root search stopped at {} with residual {:.3e}",
                solved.root, solved.residual
            )));
        }

        debug!(
            stretch = spec.name(),
            instrument = instrument.name(),
            index,
            maturity = right,
            response = solved.root,
            iterations = solved.iterations,
            residual = solved.residual,
            "instrument calibrated"
        );

        segment.set_coefficients(coefficients(solved.root))?;
        Ok(segment)
    }

    /// Refits every stretch of `curve` in least squares to samples of its
    /// own response, with the smoothing penalties.
    ///
    /// Returns a new curve without a repricing report; `curve` is left as is.
    pub fn smooth(
        &self,
        curve: &CalibratedCurve,
        settings: &SmoothingSettings,
    ) -> CurveResult<CalibratedCurve> {
        let control = settings.segment_control()?;
        let mut span = Span::new(curve.span().resolution());

        for stretch in curve.stretches() {
            let (ordinates, responses) = sample_stretch(stretch, settings.samples_per_segment)?;
            let best_fit = StretchBestFitResponse::new(ordinates, responses, None)?;

            let mut smoothed = Stretch::with_uniform_control(
                stretch.name(),
                &stretch.knots(),
                &control,
                CalibrationDetail::Calibrate,
            )?;
            smoothed.setup_best_fit(&best_fit, settings.boundary)?;

            debug!(
                stretch = stretch.name(),
                samples = best_fit.len(),
                curvature_dpe = smoothed.curvature_dpe()?,
                best_fit_dpe = smoothed.best_fit_dpe(&best_fit)?,
                "stretch smoothed"
            );
            span.add_stretch(smoothed)?;
        }

        CalibratedCurve::new(
            curve.latent_state().clone(),
            curve.metric(),
            curve.origin(),
            span,
            curve.turns().to_vec(),
        )
    }

    /// Central-difference sensitivity of the calibrated response at
    /// `ordinates` to every quote of `specs`.
    ///
    /// Each quote is bumped up and down by the configured bump and the curve
    /// recalibrated; bumps run in parallel.
    pub fn quote_jacobian(
        &self,
        specs: &[StretchRepresentationSpec],
        valuation: &ValuationParams,
        market: &MarketParams,
        ordinates: &[f64],
    ) -> CurveResult<QuoteJacobian> {
        if ordinates.is_empty() {
            return Err(CurveError::invalid_input("Quote Jacobian needs at least one ordinate"));
        }
        // Fails fast on bad inputs and ordinates outside the curve
        let base = self.calibrate(specs, valuation, market)?;
        for &t in ordinates {
            base.response_value(t)?;
        }

        let bump = self.config.jacobian_bump;
        let quotes: Vec<(usize, usize)> = specs
            .iter()
            .enumerate()
            .flat_map(|(s, spec)| (0..spec.len()).map(move |i| (s, i)))
            .collect();

        let responses = |stretch: usize, index: usize, shift: f64| -> CurveResult<Vec<f64>> {
            let mut bumped = specs.to_vec();
            bumped[stretch] = specs[stretch].bumped(index, shift)?;
            let curve = self.calibrate(&bumped, valuation, market)?;
            ordinates.iter().map(|&t| curve.response_value(t)).collect()
        };

        let sensitivities = quotes
            .par_iter()
            .map(|&(stretch, index)| {
                let up = responses(stretch, index, bump)?;
                let down = responses(stretch, index, -bump)?;
                let spec = &specs[stretch];
                Ok(QuoteSensitivity {
                    stretch: spec.name().to_string(),
                    instrument: spec.instruments()[index].name().to_string(),
                    measure: spec.measures()[index],
                    values: up
                        .iter()
                        .zip(&down)
                        .map(|(u, d)| (u - d) / (2.0 * bump))
                        .collect(),
                })
            })
            .collect::<CurveResult<Vec<_>>>()?;

        info!(
            quotes = sensitivities.len(),
            ordinates = ordinates.len(),
            bump,
            "quote jacobian computed"
        );
        Ok(QuoteJacobian {
            ordinates: ordinates.to_vec(),
            sensitivities,
        })
    }

    /// Calibrates independent jobs concurrently, one result per job in
    /// job order.
    pub fn calibrate_independent(&self, jobs: &[CalibrationJob]) -> Vec<CurveResult<CalibratedCurve>> {
        jobs.par_iter()
            .map(|job| self.calibrate(&job.specs, &job.valuation, &job.market))
            .collect()
    }
}

/// One self-contained calibration: specs plus the read-only upstream
/// curves they price against.
#[derive(Debug, Clone)]
pub struct CalibrationJob {
    /// Stretches of the curve, in order.
    pub specs: Vec<StretchRepresentationSpec>,
    /// Valuation ordinate.
    pub valuation: ValuationParams,
    /// Upstream curves, shared.
    pub market: MarketParams,
}

impl CalibrationJob {
    /// Creates a job.
    #[must_use]
    pub fn new(
        specs: Vec<StretchRepresentationSpec>,
        valuation: ValuationParams,
        market: MarketParams,
    ) -> Self {
        Self {
            specs,
            valuation,
            market,
        }
    }
}

/// `d R(t) / d quote` of one instrument at every Jacobian ordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSensitivity {
    /// Stretch holding the instrument.
    pub stretch: String,
    /// Instrument name.
    pub instrument: String,
    /// Quoted measure.
    pub measure: ManifestMeasure,
    /// One value per ordinate.
    pub values: Vec<f64>,
}

/// Response sensitivities to every calibration quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteJacobian {
    ordinates: Vec<f64>,
    sensitivities: Vec<QuoteSensitivity>,
}

impl QuoteJacobian {
    /// Ordinates the responses were taken at.
    #[must_use]
    pub fn ordinates(&self) -> &[f64] {
        &self.ordinates
    }

    /// One entry per quote, in spec order.
    #[must_use]
    pub fn sensitivities(&self) -> &[QuoteSensitivity] {
        &self.sensitivities
    }

    /// Sensitivities to the quote of `instrument` in `measure`.
    #[must_use]
    pub fn get(&self, instrument: &str, measure: ManifestMeasure) -> Option<&[f64]> {
        self.sensitivities
            .iter()
            .find(|s| s.instrument == instrument && s.measure == measure)
            .map(|s| s.values.as_slice())
    }

    /// Number of quotes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensitivities.len()
    }

    /// Returns true if there are no quotes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensitivities.is_empty()
    }
}

/// Checks a spec set before calibration and returns its common state and
/// metric.
///
/// Rejects an empty set, mixed states or metrics, duplicate stretch names,
/// non-finite quotes and maturities that do not strictly increase from the
/// valuation ordinate across the concatenated instrument list.
pub fn validate_specs<'a>(
    specs: &'a [StretchRepresentationSpec],
    valuation: &ValuationParams,
) -> CurveResult<(&'a LatentState, QuantificationMetric)> {
    let Some(first) = specs.first() else {
        return Err(CurveError::invalid_input("Calibration needs at least one stretch spec"));
    };
    let state = first.latent_state();
    let metric = first.metric();

    for (i, spec) in specs.iter().enumerate() {
        if spec.latent_state() != state {
            return Err(CurveError::IncompatibleMetric {
                expected: state.to_string(),
                got: spec.latent_state().to_string(),
            });
        }
        if spec.metric() != metric {
            return Err(CurveError::IncompatibleMetric {
                expected: metric.to_string(),
                got: spec.metric().to_string(),
            });
        }
        if specs[..i].iter().any(|other| other.name() == spec.name()) {
            return Err(CurveError::invalid_input(format!(
                "Duplicate stretch name '{}'",
                spec.name()
            )));
        }
        if let Some(index) = spec.quotes().iter().position(|q| !q.is_finite()) {
            return Err(CurveError::MissingQuote {
                stretch: spec.name().to_string(),
                index,
            });
        }
    }

    let mut previous = valuation.valuation_ordinate();
    let maturities = specs
        .iter()
        .flat_map(|spec| spec.instruments().iter().map(|i| i.maturity()));
    for (index, current) in maturities.enumerate() {
        if current <= previous || current.is_nan() {
            return Err(CurveError::NonMonotonicInput {
                index,
                previous,
                current,
            });
        }
        previous = current;
    }

    Ok((state, metric))
}

/// Anchor or continuity constraints followed by `R(right) = guess`.
fn segment_constraints(
    frame: &CurveFrame<'_>,
    calibrated: &[Segment],
    segment: &Segment,
    guess: f64,
) -> CurveResult<Vec<SegmentConstraint>> {
    let left = segment.left();
    let mut constraints = match calibrated.last() {
        None => vec![match frame.metric.anchor() {
            Some(value) => SegmentConstraint::response(left, value),
            None => SegmentConstraint::derivative(left, 1, 0.0),
        }],
        Some(previous) => (0..=segment.inelastic().ck)
            .map(|order| {
                Ok(SegmentConstraint::derivative(
                    left,
                    order,
                    previous.response_value_derivative(left, order)?,
                ))
            })
            .collect::<CurveResult<Vec<_>>>()?,
    };
    constraints.push(SegmentConstraint::response(segment.right(), guess));
    Ok(constraints)
}

/// Coefficients at the guess and their sensitivity to the last constraint.
fn affine_response(segment: &Segment) -> CurveResult<(DVector<f64>, DVector<f64>)> {
    let (Some(base), Some(sensitivity)) = (segment.coefficients(), segment.constraint_sensitivity()) else {
        return Err(SplineError::Uncalibrated {
            name: format!("segment [{}, {}]", segment.left(), segment.right()),
        }
        .into());
    };
    let last = sensitivity.ncols().saturating_sub(1);
    Ok((base.clone(), sensitivity.column(last).into_owned()))
}

/// `samples` evenly spaced points per segment, shared knots once.
fn sample_stretch(stretch: &Stretch, samples: usize) -> CurveResult<(Vec<f64>, Vec<f64>)> {
    let mut ordinates = Vec::new();
    for (i, segment) in stretch.segments().iter().enumerate() {
        let step = (segment.right() - segment.left()) / (samples - 1) as f64;
        let start = usize::from(i > 0);
        ordinates.extend((start..samples).map(|j| {
            if j + 1 == samples {
                segment.right()
            } else {
                segment.left() + step * j as f64
            }
        }));
    }
    let responses = ordinates
        .iter()
        .map(|&x| stretch.response_value(x))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((ordinates, responses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::{CalibratableInstrument, Deposit, FixFloatSwap};
    use crate::representation::SharedInstrument;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn deposit_spec(quotes: Vec<f64>) -> StretchRepresentationSpec {
        let instruments: Vec<SharedInstrument> = vec![
            Arc::new(Deposit::new("3M", 0.0, 0.25).unwrap()),
            Arc::new(Deposit::new("6M", 0.0, 0.5).unwrap()),
            Arc::new(Deposit::new("1Y", 0.0, 1.0).unwrap()),
        ];
        StretchRepresentationSpec::new(
            "deposits",
            LatentState::Funding,
            QuantificationMetric::DiscountFactor,
            instruments,
            vec![ManifestMeasure::Rate; 3],
            quotes,
        )
        .unwrap()
    }

    fn swap_spec() -> StretchRepresentationSpec {
        let instruments: Vec<SharedInstrument> = vec![
            Arc::new(FixFloatSwap::new("2Y", 0.0, 2.0, 1, 2).unwrap()),
            Arc::new(FixFloatSwap::new("5Y", 0.0, 5.0, 1, 2).unwrap()),
        ];
        StretchRepresentationSpec::new(
            "swaps",
            LatentState::Funding,
            QuantificationMetric::DiscountFactor,
            instruments,
            vec![ManifestMeasure::SwapRate; 2],
            vec![0.035, 0.038],
        )
        .unwrap()
    }

    #[test]
    fn test_deposits_reprice() {
        let spec = deposit_spec(vec![0.030, 0.031, 0.032]);
        let curve = LinearCurveCalibrator::default()
            .calibrate(&[spec], &ValuationParams::default(), &MarketParams::new())
            .unwrap();

        let one_year = Deposit::new("check", 0.0, 1.0).unwrap();
        let market = MarketParams::new();
        let curves = PricingCurves::new(&curve, &market);
        assert_relative_eq!(
            one_year.measure_value(ManifestMeasure::Rate, &curves).unwrap(),
            0.032,
            epsilon = 1e-10
        );
        assert_relative_eq!(curve.discount_factor(0.0).unwrap(), 1.0, epsilon = 1e-14);
        assert!(curve.repricing_report().unwrap().is_valid());
    }

    #[test]
    fn test_stretches_are_continuous() {
        let curve = LinearCurveCalibrator::default()
            .calibrate(
                &[deposit_spec(vec![0.030, 0.031, 0.032]), swap_spec()],
                &ValuationParams::default(),
                &MarketParams::new(),
            )
            .unwrap();

        assert_eq!(curve.stretches().len(), 2);
        let joint = curve.stretch("deposits").unwrap().right();
        let left_side = curve.stretch("deposits").unwrap().response_value(joint).unwrap();
        let right_side = curve.stretch("swaps").unwrap().response_value(joint).unwrap();
        assert_relative_eq!(left_side, right_side, epsilon = 1e-12);

        let d_left = curve.stretch("deposits").unwrap().response_value_derivative(joint, 1).unwrap();
        let d_right = curve.stretch("swaps").unwrap().response_value_derivative(joint, 1).unwrap();
        assert_relative_eq!(d_left, d_right, epsilon = 1e-10);
    }

    #[test]
    fn test_validation_errors() {
        let calibrator = LinearCurveCalibrator::default();
        let valuation = ValuationParams::default();
        let market = MarketParams::new();

        assert!(matches!(
            calibrator.calibrate(&[], &valuation, &market),
            Err(CurveError::InvalidConstructionInput { .. })
        ));

        let missing = deposit_spec(vec![0.030, f64::NAN, 0.032]);
        assert!(matches!(
            calibrator.calibrate(&[missing], &valuation, &market),
            Err(CurveError::MissingQuote { index: 1, .. })
        ));

        // Swaps first, deposits after: maturities go back from 5Y to 3M
        let unordered = [swap_spec(), deposit_spec(vec![0.03, 0.031, 0.032])];
        assert!(matches!(
            calibrator.calibrate(&unordered, &valuation, &market),
            Err(CurveError::NonMonotonicInput { index: 2, .. })
        ));

        let late = ValuationParams::new(0.5).unwrap();
        assert!(matches!(
            calibrator.calibrate(&[deposit_spec(vec![0.03, 0.031, 0.032])], &late, &market),
            Err(CurveError::NonMonotonicInput { index: 0, .. })
        ));
    }

    #[test]
    fn test_duplicate_stretch_names_rejected() {
        let a = deposit_spec(vec![0.030, 0.031, 0.032]);
        let b = swap_spec();
        let renamed = StretchRepresentationSpec::new(
            "deposits",
            b.latent_state().clone(),
            b.metric(),
            b.instruments().to_vec(),
            b.measures().to_vec(),
            b.quotes().to_vec(),
        )
        .unwrap();

        let err = validate_specs(&[a, renamed], &ValuationParams::default()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CalibratorConfig::default().with_solver_tolerance(-1.0);
        assert!(LinearCurveCalibrator::new(config).is_err());
    }

    #[test]
    fn test_sample_stretch_shares_knots() {
        let curve = LinearCurveCalibrator::default()
            .calibrate(
                &[deposit_spec(vec![0.030, 0.031, 0.032])],
                &ValuationParams::default(),
                &MarketParams::new(),
            )
            .unwrap();
        let stretch = curve.stretch("deposits").unwrap();

        let (ordinates, responses) = sample_stretch(stretch, 3).unwrap();

        assert_eq!(ordinates.len(), 7);
        assert_eq!(ordinates[0], 0.0);
        assert_eq!(ordinates[2], 0.25);
        assert_eq!(*ordinates.last().unwrap(), 1.0);
        assert!(ordinates.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(responses.len(), 7);
    }
}
