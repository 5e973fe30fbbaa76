//! Integration test: bootstrap funding, forward and credit curves.
//!
//! Market data (year fractions from valuation at t = 0):
//!
//! | Instrument | Tenor | Quote   |
//! |------------|-------|---------|
//! | Deposit    | 3M    | 3.00%   |
//! | Deposit    | 6M    | 3.10%   |
//! | Deposit    | 1Y    | 3.20%   |
//! | Swap       | 2Y    | 3.40%   |
//! | Swap       | 3Y    | 3.55%   |
//! | Swap       | 5Y    | 3.70%   |

use approx::assert_relative_eq;
use knotwork_curves::prelude::*;
use std::sync::Arc;

// =============================================================================
// MARKET DATA
// =============================================================================

const DEPOSIT_QUOTES: [f64; 3] = [0.030, 0.031, 0.032];
const SWAP_QUOTES: [f64; 3] = [0.034, 0.0355, 0.037];

fn deposits(metric: QuantificationMetric) -> StretchRepresentationSpec {
    let instruments: Vec<SharedInstrument> = vec![
        Arc::new(Deposit::new("3M", 0.0, 0.25).unwrap()),
        Arc::new(Deposit::new("6M", 0.0, 0.5).unwrap()),
        Arc::new(Deposit::new("1Y", 0.0, 1.0).unwrap()),
    ];
    StretchRepresentationSpec::new(
        "money-market",
        LatentState::Funding,
        metric,
        instruments,
        vec![ManifestMeasure::Rate; 3],
        DEPOSIT_QUOTES.to_vec(),
    )
    .unwrap()
}

fn swaps(metric: QuantificationMetric) -> StretchRepresentationSpec {
    let instruments: Vec<SharedInstrument> = vec![
        Arc::new(FixFloatSwap::new("2Y", 0.0, 2.0, 1, 2).unwrap()),
        Arc::new(FixFloatSwap::new("3Y", 0.0, 3.0, 1, 2).unwrap()),
        Arc::new(FixFloatSwap::new("5Y", 0.0, 5.0, 1, 2).unwrap()),
    ];
    StretchRepresentationSpec::new(
        "swaps",
        LatentState::Funding,
        metric,
        instruments,
        vec![ManifestMeasure::SwapRate; 3],
        SWAP_QUOTES.to_vec(),
    )
    .unwrap()
}

fn funding_curve() -> CalibratedCurve {
    LinearCurveCalibrator::default()
        .calibrate(
            &[
                deposits(QuantificationMetric::DiscountFactor),
                swaps(QuantificationMetric::DiscountFactor),
            ],
            &ValuationParams::default(),
            &MarketParams::new(),
        )
        .unwrap()
}

fn assert_reprices(curve: &CalibratedCurve, specs: &[StretchRepresentationSpec], market: &MarketParams) {
    let curves = PricingCurves::new(curve, market);
    for spec in specs {
        for ((instrument, measure), quote) in spec
            .instruments()
            .iter()
            .zip(spec.measures())
            .zip(spec.quotes())
        {
            let model = instrument.measure_value(*measure, &curves).unwrap();
            assert!(
                (model - quote).abs() < 1e-10,
                "{} {measure}: model {model} vs quote {quote}",
                instrument.name()
            );
        }
    }
}

// =============================================================================
// FUNDING CURVES
// =============================================================================

#[test]
fn test_funding_curve_reprices_every_instrument() {
    let curve = funding_curve();
    let specs = [
        deposits(QuantificationMetric::DiscountFactor),
        swaps(QuantificationMetric::DiscountFactor),
    ];

    assert_reprices(&curve, &specs, &MarketParams::new());

    let report = curve.repricing_report().unwrap();
    assert_eq!(report.checks().len(), 6);
    assert!(report.is_valid());
    assert!(report.max_error() < 1e-10);

    assert_eq!(curve.stretches().len(), 2);
    assert_eq!(curve.domain(), (0.0, 5.0));
}

#[test]
fn test_funding_curve_shape() {
    let curve = funding_curve();

    assert_relative_eq!(curve.discount_factor(0.0).unwrap(), 1.0, epsilon = 1e-14);
    // A deposit pins its own discount factor: P = 1 / (1 + r t)
    assert_relative_eq!(
        curve.discount_factor(1.0).unwrap(),
        1.0 / (1.0 + 0.032),
        epsilon = 1e-12
    );

    let mut previous = 1.0;
    for i in 1..=50 {
        let df = curve.discount_factor(0.1 * f64::from(i)).unwrap();
        assert!(df < previous, "discount factor not decreasing at {}", 0.1 * f64::from(i));
        previous = df;
    }

    let zero_5y = curve.zero_rate(5.0).unwrap();
    assert!(zero_5y > 0.03 && zero_5y < 0.04);

    let forward = curve.forward_rate(4.0, 5.0).unwrap();
    assert!(forward > zero_5y);
}

#[test]
fn test_zero_and_forward_rate_metrics() {
    let reference = funding_curve();

    for metric in [QuantificationMetric::ZeroRate, QuantificationMetric::ForwardRate] {
        let specs = [deposits(metric), swaps(metric)];
        let curve = LinearCurveCalibrator::default()
            .calibrate(&specs, &ValuationParams::default(), &MarketParams::new())
            .unwrap();

        assert_eq!(curve.metric(), metric);
        assert!(curve.repricing_report().unwrap().is_valid());
        assert_reprices(&curve, &specs, &MarketParams::new());

        // Deposit knots do not depend on the interpolation
        for t in [0.25, 0.5, 1.0] {
            assert_relative_eq!(
                curve.discount_factor(t).unwrap(),
                reference.discount_factor(t).unwrap(),
                epsilon = 1e-10
            );
        }
    }
}

#[test]
fn test_turn_adjustment_is_absorbed_by_calibration() {
    let turn = TurnAdjustment::new(0.9, 1.1, 0.01).unwrap();
    let specs = [
        deposits(QuantificationMetric::DiscountFactor)
            .with_turns(vec![turn])
            .unwrap(),
        swaps(QuantificationMetric::DiscountFactor),
    ];

    let curve = LinearCurveCalibrator::default()
        .calibrate(&specs, &ValuationParams::default(), &MarketParams::new())
        .unwrap();

    assert_eq!(curve.turns(), &[turn]);
    assert_reprices(&curve, &specs, &MarketParams::new());

    // The spline carries the turn back out at the 1Y knot
    let spline = curve.response_value(1.0).unwrap();
    assert_relative_eq!(spline * (-0.01f64 * 0.1).exp(), 1.0 / 1.032, epsilon = 1e-12);
}

// =============================================================================
// FORWARD AND CREDIT CURVES
// =============================================================================

#[test]
fn test_forward_curve_from_futures() {
    let market = MarketParams::new().with_curve(Arc::new(funding_curve()));
    let prices = [96.80, 96.70, 96.55, 96.40];
    let instruments: Vec<SharedInstrument> = (0..4)
        .map(|i| {
            let start = 0.25 * f64::from(i);
            let future = RateFuture::new(format!("F{}", i + 1), start, start + 0.25)
                .unwrap()
                .with_index("SOFR3M")
                .unwrap();
            Arc::new(future) as SharedInstrument
        })
        .collect();
    let spec = StretchRepresentationSpec::new(
        "futures",
        LatentState::forward("SOFR3M"),
        QuantificationMetric::DiscountFactor,
        instruments,
        vec![ManifestMeasure::Price; 4],
        prices.to_vec(),
    )
    .unwrap();

    let curve = LinearCurveCalibrator::default()
        .calibrate(std::slice::from_ref(&spec), &ValuationParams::default(), &market)
        .unwrap();

    assert_eq!(curve.latent_state(), &LatentState::forward("SOFR3M"));
    for (i, price) in prices.iter().enumerate() {
        let start = 0.25 * i as f64;
        let rate = curve.forward_rate(start, start + 0.25).unwrap();
        assert_relative_eq!(rate, (100.0 - price) / 100.0, epsilon = 1e-10);
    }
}

#[test]
fn test_basis_swap_curve_against_reference_index() {
    let funding = Arc::new(funding_curve());

    let index_swaps: Vec<SharedInstrument> = [1.0, 2.0, 5.0]
        .iter()
        .map(|&t| {
            let swap = FixFloatSwap::new(format!("3M-{t}Y"), 0.0, t, 1, 4)
                .unwrap()
                .with_index("3M")
                .unwrap();
            Arc::new(swap) as SharedInstrument
        })
        .collect();
    let reference_spec = StretchRepresentationSpec::new(
        "3M-swaps",
        LatentState::forward("3M"),
        QuantificationMetric::DiscountFactor,
        index_swaps,
        vec![ManifestMeasure::SwapRate; 3],
        vec![0.0335, 0.035, 0.0375],
    )
    .unwrap();
    let market = MarketParams::new().with_curve(funding.clone());
    let reference = LinearCurveCalibrator::default()
        .calibrate(&[reference_spec], &ValuationParams::default(), &market)
        .unwrap();

    let market = market.with_curve(Arc::new(reference));
    let basis_swaps: Vec<SharedInstrument> = [1.0, 2.0, 5.0]
        .iter()
        .map(|&t| {
            Arc::new(FloatFloatBasisSwap::new(format!("3s6s-{t}Y"), 0.0, t, 2, "3M", "6M").unwrap())
                as SharedInstrument
        })
        .collect();
    let spreads = vec![0.0010, 0.0012, 0.0015];
    let spec = StretchRepresentationSpec::new(
        "3s6s",
        LatentState::forward("6M"),
        QuantificationMetric::DiscountFactor,
        basis_swaps,
        vec![ManifestMeasure::DerivedParBasisSpread; 3],
        spreads,
    )
    .unwrap();

    let curve = LinearCurveCalibrator::default()
        .calibrate(std::slice::from_ref(&spec), &ValuationParams::default(), &market)
        .unwrap();

    assert!(curve.repricing_report().unwrap().is_valid());
    assert_reprices(&curve, std::slice::from_ref(&spec), &market);
}

#[test]
fn test_missing_market_curve_is_reported() {
    let swap = FixFloatSwap::new("1Y", 0.0, 1.0, 1, 4)
        .unwrap()
        .with_index("3M")
        .unwrap();
    let spec = StretchRepresentationSpec::new(
        "3M-swaps",
        LatentState::forward("3M"),
        QuantificationMetric::DiscountFactor,
        vec![Arc::new(swap)],
        vec![ManifestMeasure::SwapRate],
        vec![0.035],
    )
    .unwrap();

    let err = LinearCurveCalibrator::default()
        .calibrate(&[spec], &ValuationParams::default(), &MarketParams::new())
        .unwrap_err();

    assert!(matches!(err, CurveError::CurveNotFound { .. }));
}

#[test]
fn test_credit_curve_from_cds() {
    let market = MarketParams::new().with_curve(Arc::new(funding_curve()));
    let instruments: Vec<SharedInstrument> = [1.0, 3.0, 5.0]
        .iter()
        .map(|&t| {
            Arc::new(CreditDefaultSwap::new(format!("CDS-{t}Y"), 0.0, t, 4, "ACME", 0.4).unwrap())
                as SharedInstrument
        })
        .collect();
    let spec = StretchRepresentationSpec::new(
        "acme",
        LatentState::credit("ACME"),
        QuantificationMetric::SurvivalProbability,
        instruments,
        vec![ManifestMeasure::ParSpread; 3],
        vec![0.010, 0.012, 0.014],
    )
    .unwrap();

    let curve = LinearCurveCalibrator::default()
        .calibrate(std::slice::from_ref(&spec), &ValuationParams::default(), &market)
        .unwrap();

    assert!(curve.repricing_report().unwrap().is_valid());
    assert_reprices(&curve, std::slice::from_ref(&spec), &market);

    let s1 = curve.survival_probability(1.0).unwrap();
    let s3 = curve.survival_probability(3.0).unwrap();
    let s5 = curve.survival_probability(5.0).unwrap();
    assert!(1.0 > s1 && s1 > s3 && s3 > s5);
    // Credit triangle: hazard ≈ spread / (1 - recovery)
    assert_relative_eq!(s1, (-0.010f64 / 0.6).exp(), epsilon = 2e-3);

    assert!(funding_curve().survival_probability(1.0).is_err());
}

// =============================================================================
// SENSITIVITIES AND PARALLEL CALIBRATION
// =============================================================================

#[test]
fn test_quote_jacobian_of_deposit_curve() {
    let calibrator = LinearCurveCalibrator::default();
    let specs = [deposits(QuantificationMetric::DiscountFactor)];
    let ordinates = [0.25, 0.5, 1.0];

    let jacobian = calibrator
        .quote_jacobian(&specs, &ValuationParams::default(), &MarketParams::new(), &ordinates)
        .unwrap();

    assert_eq!(jacobian.len(), 3);
    assert_eq!(jacobian.ordinates(), &ordinates);

    let one_year = jacobian.get("1Y", ManifestMeasure::Rate).unwrap();
    // dP/dr = -t / (1 + r t)²
    assert_relative_eq!(one_year[2], -1.0 / (1.032f64 * 1.032), epsilon = 1e-5);
    assert!(one_year[0].abs() < 1e-5);
    assert!(one_year[1].abs() < 1e-5);

    let three_month = jacobian.get("3M", ManifestMeasure::Rate).unwrap();
    assert_relative_eq!(
        three_month[0],
        -0.25 / (1.0075f64 * 1.0075),
        epsilon = 1e-5
    );

    assert!(jacobian.get("1Y", ManifestMeasure::SwapRate).is_none());
}

#[test]
fn test_quote_jacobian_rejects_ordinates_outside_curve() {
    let result = LinearCurveCalibrator::default().quote_jacobian(
        &[deposits(QuantificationMetric::DiscountFactor)],
        &ValuationParams::default(),
        &MarketParams::new(),
        &[2.0],
    );
    assert!(result.is_err());
}

#[test]
fn test_calibrate_independent_matches_sequential() {
    let calibrator = LinearCurveCalibrator::default();
    let valuation = ValuationParams::default();
    let steep = deposits(QuantificationMetric::DiscountFactor)
        .with_quotes(vec![0.02, 0.03, 0.04])
        .unwrap();
    let missing = deposits(QuantificationMetric::DiscountFactor)
        .with_quotes(vec![0.02, f64::NAN, 0.04])
        .unwrap();

    let jobs = vec![
        CalibrationJob::new(
            vec![
                deposits(QuantificationMetric::DiscountFactor),
                swaps(QuantificationMetric::DiscountFactor),
            ],
            valuation,
            MarketParams::new(),
        ),
        CalibrationJob::new(vec![steep], valuation, MarketParams::new()),
        CalibrationJob::new(vec![missing], valuation, MarketParams::new()),
    ];

    let results = calibrator.calibrate_independent(&jobs);

    assert_eq!(results.len(), 3);
    let sequential = funding_curve();
    let parallel = results[0].as_ref().unwrap();
    for t in [0.1, 0.7, 2.5, 4.9] {
        assert_eq!(
            parallel.discount_factor(t).unwrap(),
            sequential.discount_factor(t).unwrap()
        );
    }
    let steep_curve = results[1].as_ref().unwrap();
    assert_relative_eq!(
        steep_curve.discount_factor(1.0).unwrap(),
        1.0 / 1.04,
        epsilon = 1e-12
    );
    assert!(matches!(results[2], Err(CurveError::MissingQuote { index: 1, .. })));
}

// =============================================================================
// SMOOTHING
// =============================================================================

#[test]
fn test_smoothing_returns_new_curve() {
    let curve = funding_curve();
    let before: Vec<f64> = (0..=20)
        .map(|i| curve.response_value(0.25 * f64::from(i)).unwrap())
        .collect();

    let smoothed = LinearCurveCalibrator::default()
        .smooth(&curve, &SmoothingSettings::default())
        .unwrap();

    // The exact curve is untouched
    let after: Vec<f64> = (0..=20)
        .map(|i| curve.response_value(0.25 * f64::from(i)).unwrap())
        .collect();
    assert_eq!(before, after);
    assert!(curve.repricing_report().is_some());

    assert!(smoothed.repricing_report().is_none());
    assert_eq!(smoothed.stretches().len(), curve.stretches().len());
    assert_eq!(smoothed.domain(), curve.domain());
    for (i, exact) in before.iter().enumerate() {
        let t = 0.25 * i as f64;
        assert_relative_eq!(smoothed.response_value(t).unwrap(), *exact, epsilon = 1e-3);
    }
}

// =============================================================================
// INPUT VALIDATION
// =============================================================================

#[test]
fn test_mismatched_spec_lengths() {
    let err = StretchRepresentationSpec::new(
        "short",
        LatentState::Funding,
        QuantificationMetric::DiscountFactor,
        vec![Arc::new(Deposit::new("1Y", 0.0, 1.0).unwrap())],
        vec![ManifestMeasure::Rate, ManifestMeasure::Rate],
        vec![0.03],
    )
    .unwrap_err();

    assert!(matches!(err, CurveError::InvalidConstructionInput { .. }));
}

#[test]
fn test_missing_quote_and_unordered_maturities() {
    let calibrator = LinearCurveCalibrator::default();
    let valuation = ValuationParams::default();
    let market = MarketParams::new();

    let spec = deposits(QuantificationMetric::DiscountFactor)
        .with_quotes(vec![f64::NAN, 0.031, 0.032])
        .unwrap();
    assert!(matches!(
        calibrator.calibrate(&[spec], &valuation, &market),
        Err(CurveError::MissingQuote { index: 0, .. })
    ));

    let specs = [
        swaps(QuantificationMetric::DiscountFactor),
        deposits(QuantificationMetric::DiscountFactor),
    ];
    assert!(matches!(
        calibrator.calibrate(&specs, &valuation, &market),
        Err(CurveError::NonMonotonicInput { .. })
    ));
}

#[test]
fn test_mixed_metrics_rejected() {
    let specs = [
        deposits(QuantificationMetric::DiscountFactor),
        swaps(QuantificationMetric::ZeroRate),
    ];

    let err = LinearCurveCalibrator::default()
        .calibrate(&specs, &ValuationParams::default(), &MarketParams::new())
        .unwrap_err();

    assert!(matches!(err, CurveError::IncompatibleMetric { .. }));
}

#[test]
fn test_unreachable_quote_fails_with_instrument_index() {
    // A deposit rate of -100% needs 1 / P(1Y) = 0, which no finite discount
    // factor gives
    let spec = deposits(QuantificationMetric::DiscountFactor)
        .with_quotes(vec![0.03, 0.031, -1.0])
        .unwrap();

    let err = LinearCurveCalibrator::default()
        .calibrate(&[spec], &ValuationParams::default(), &MarketParams::new())
        .unwrap_err();

    match err {
        CurveError::InstrumentCalibrationFailed { stretch, index, .. } => {
            assert_eq!(stretch, "money-market");
            assert_eq!(index, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}
