//! Local-control (Hermite) stretch construction.
//!
//! Nodal slopes are estimated from the data by one of the
//! [`SlopeAlgorithm`] estimators, optionally cleaned of spurious extrema
//! and passed through a monotone filter, then fed as `(y_i, m_i)` edge
//! states to [`Stretch::setup_hermite`].

mod slopes;

use crate::error::{SplineError, SplineResult};
use crate::segment::{PredictorResponseDerivative, SegmentCustomBuilderControl};
use crate::stretch::{validate_ordinates, CalibrationDetail, Stretch};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use slopes::Secants;
use std::fmt;
use tracing::debug;

type SlopeEstimator = fn(&Secants) -> Vec<f64>;

/// Relative response bump for slope sensitivities.
const SLOPE_BUMP: f64 = 1e-6;

/// Nodal slope estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeAlgorithm {
    /// Parabola through three neighbouring knots.
    Bessel,
    /// Hyman (1983) monotonicity limiter on Bessel slopes.
    Hyman83,
    /// Hyman (1989) limiter with the Dougherty-Edelman extension; slopes at
    /// interior data extrema are limited, not zeroed.
    Hyman89,
    /// Fritsch-Butland weighted harmonic mean.
    Harmonic,
    /// Van Leer flux limiter.
    VanLeer,
    /// Kruger constrained cubic spline.
    Kruger,
    /// Akima (1970) local weighting.
    Akima,
}

impl SlopeAlgorithm {
    /// All estimators.
    pub const ALL: [SlopeAlgorithm; 7] = [
        Self::Bessel,
        Self::Hyman83,
        Self::Hyman89,
        Self::Harmonic,
        Self::VanLeer,
        Self::Kruger,
        Self::Akima,
    ];

    fn estimator(self) -> SlopeEstimator {
        match self {
            Self::Bessel => slopes::bessel,
            Self::Hyman83 => slopes::hyman83,
            Self::Hyman89 => slopes::hyman89,
            Self::Harmonic => slopes::harmonic,
            Self::VanLeer => slopes::van_leer,
            Self::Kruger => slopes::kruger,
            Self::Akima => slopes::akima,
        }
    }

    /// Estimates one slope per knot.
    pub fn estimate(self, xs: &[f64], ys: &[f64]) -> SplineResult<Vec<f64>> {
        let secants = checked_secants(xs, ys)?;
        Ok((self.estimator())(&secants))
    }
}

impl fmt::Display for SlopeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bessel => "Bessel",
            Self::Hyman83 => "Hyman83",
            Self::Hyman89 => "Hyman89",
            Self::Harmonic => "Harmonic",
            Self::VanLeer => "VanLeer",
            Self::Kruger => "Kruger",
            Self::Akima => "Akima",
        };
        write!(f, "{name}")
    }
}

fn checked_secants(xs: &[f64], ys: &[f64]) -> SplineResult<Secants> {
    validate_ordinates(xs)?;
    if xs.len() != ys.len() {
        return Err(SplineError::invalid_input(format!(
            "{} predictor ordinates but {} responses",
            xs.len(),
            ys.len()
        )));
    }
    if let Some(y) = ys.iter().find(|y| !y.is_finite()) {
        return Err(SplineError::invalid_input(format!("Response {y} is not finite")));
    }
    Ok(Secants::new(xs, ys))
}

/// Zeroes slopes whose sign disagrees with the data on both sides of a
/// knot, so the interpolant has no extremum the data lacks.
pub fn eliminate_spurious_extrema(xs: &[f64], ys: &[f64], slopes: &mut [f64]) -> SplineResult<()> {
    let secants = checked_secants(xs, ys)?;
    check_slope_count(xs, slopes)?;
    slopes::eliminate_spurious_extrema(&secants, slopes);
    Ok(())
}

/// Monotone filter: zero slope at data extrema and flat intervals,
/// otherwise `|m_i| <= 3 · min(|Δ_{i-1}|, |Δ_i|)` with the sign of the data.
pub fn apply_monotone_filter(xs: &[f64], ys: &[f64], slopes: &mut [f64]) -> SplineResult<()> {
    let secants = checked_secants(xs, ys)?;
    check_slope_count(xs, slopes)?;
    slopes::apply_monotone_filter(&secants, slopes);
    Ok(())
}

fn check_slope_count(xs: &[f64], slopes: &[f64]) -> SplineResult<()> {
    if slopes.len() == xs.len() {
        Ok(())
    } else {
        Err(SplineError::invalid_input(format!(
            "{} knots but {} slopes",
            xs.len(),
            slopes.len()
        )))
    }
}

/// Builds Hermite stretches from data and a slope estimator.
///
/// # Example
///
/// ```rust
/// use knotwork_spline::prelude::*;
///
/// let stretch = LocalControlStretchBuilder::new("pchip", SlopeAlgorithm::Harmonic)
///     .with_monotone_filter(true)
///     .build(&[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 2.5, 4.0])
///     .unwrap();
///
/// assert!((stretch.response_value(2.0).unwrap() - 2.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LocalControlStretchBuilder {
    name: String,
    algorithm: SlopeAlgorithm,
    control: SegmentCustomBuilderControl,
    eliminate_spurious_extrema: bool,
    monotone_filter: bool,
    detail: CalibrationDetail,
}

impl LocalControlStretchBuilder {
    /// Creates a builder with `C^1` cubic segments and no filtering.
    #[must_use]
    pub fn new(name: impl Into<String>, algorithm: SlopeAlgorithm) -> Self {
        Self {
            name: name.into(),
            algorithm,
            control: SegmentCustomBuilderControl::cubic(1),
            eliminate_spurious_extrema: false,
            monotone_filter: false,
            detail: CalibrationDetail::Calibrate,
        }
    }

    /// Sets the segment control used for every segment.
    #[must_use]
    pub fn with_control(mut self, control: SegmentCustomBuilderControl) -> Self {
        self.control = control;
        self
    }

    /// Enables spurious extrema elimination.
    #[must_use]
    pub fn with_spurious_extrema_elimination(mut self, enabled: bool) -> Self {
        self.eliminate_spurious_extrema = enabled;
        self
    }

    /// Enables the monotone filter.
    #[must_use]
    pub fn with_monotone_filter(mut self, enabled: bool) -> Self {
        self.monotone_filter = enabled;
        self
    }

    /// Sets the calibration detail of the built stretch.
    #[must_use]
    pub fn with_detail(mut self, detail: CalibrationDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Slope estimator in use.
    #[must_use]
    pub fn algorithm(&self) -> SlopeAlgorithm {
        self.algorithm
    }

    /// Nodal slopes after the enabled filters.
    pub fn slopes(&self, xs: &[f64], ys: &[f64]) -> SplineResult<Vec<f64>> {
        let secants = checked_secants(xs, ys)?;
        let mut slopes = (self.algorithm.estimator())(&secants);
        if self.eliminate_spurious_extrema {
            slopes::eliminate_spurious_extrema(&secants, &mut slopes);
        }
        if self.monotone_filter {
            slopes::apply_monotone_filter(&secants, &mut slopes);
        }
        Ok(slopes)
    }

    /// `d m_k / d y_j` of the filtered slopes, by central differences.
    ///
    /// Limiters are only piecewise smooth; at a switch point the result is
    /// the average of the one-sided derivatives.
    pub fn slope_sensitivity(&self, xs: &[f64], ys: &[f64]) -> SplineResult<DMatrix<f64>> {
        let n = ys.len();
        let mut sensitivity = DMatrix::zeros(n, n);
        let mut bumped = ys.to_vec();
        for j in 0..n {
            let h = SLOPE_BUMP * ys[j].abs().max(1.0);
            bumped[j] = ys[j] + h;
            let up = self.slopes(xs, &bumped)?;
            bumped[j] = ys[j] - h;
            let down = self.slopes(xs, &bumped)?;
            bumped[j] = ys[j];
            for (k, (u, d)) in up.iter().zip(&down).enumerate() {
                sensitivity[(k, j)] = (u - d) / (2.0 * h);
            }
        }
        Ok(sensitivity)
    }

    /// Builds and calibrates the stretch through `(xs, ys)`.
    ///
    /// With `CalibrateJacobian` the input Jacobian carries the dependence
    /// of every estimated slope on the knot responses.
    pub fn build(&self, xs: &[f64], ys: &[f64]) -> SplineResult<Stretch> {
        let slopes = self.slopes(xs, ys)?;
        let states: Vec<PredictorResponseDerivative> = ys
            .iter()
            .zip(&slopes)
            .map(|(&y, &m)| PredictorResponseDerivative::new(y, vec![m]))
            .collect();

        let mut stretch = Stretch::with_uniform_control(&self.name, xs, &self.control, self.detail)?;
        let segments = stretch.segment_count();
        let sensitivity = match self.detail {
            CalibrationDetail::CalibrateJacobian => Some(self.slope_sensitivity(xs, ys)?),
            CalibrationDetail::Calibrate => None,
        };
        stretch.setup_hermite_chained(
            &states[..segments],
            &states[1..],
            None,
            None,
            sensitivity.as_ref(),
        )?;

        debug!(
            stretch = %self.name,
            algorithm = %self.algorithm,
            knots = xs.len(),
            "local control stretch built"
        );
        Ok(stretch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::MonotoneType;
    use approx::assert_relative_eq;

    const XS: [f64; 6] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
    const YS: [f64; 6] = [1.0, 2.0, 3.5, 4.0, 6.0, 9.0];

    #[test]
    fn test_every_algorithm_interpolates_knots() {
        for algorithm in SlopeAlgorithm::ALL {
            let stretch = LocalControlStretchBuilder::new("s", algorithm)
                .build(&XS, &YS)
                .unwrap();
            for (x, y) in XS.iter().zip(YS) {
                assert_relative_eq!(stretch.response_value(*x).unwrap(), y, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_hermite_slopes_at_knots() {
        let builder = LocalControlStretchBuilder::new("s", SlopeAlgorithm::Bessel);
        let slopes = builder.slopes(&XS, &YS).unwrap();
        let stretch = builder.build(&XS, &YS).unwrap();

        for (x, m) in XS.iter().zip(slopes) {
            assert_relative_eq!(stretch.response_value_derivative(*x, 1).unwrap(), m, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_hyman83_increasing_data() {
        let stretch = LocalControlStretchBuilder::new("hyman", SlopeAlgorithm::Hyman83)
            .build(&XS, &YS)
            .unwrap();

        for segment in stretch.segments() {
            assert_eq!(segment.monotone_type().unwrap(), MonotoneType::Increasing);
        }
    }

    #[test]
    fn test_monotone_filter_flattens_plateau() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 1.0, 1.0, 2.0];
        let slopes = LocalControlStretchBuilder::new("s", SlopeAlgorithm::Bessel)
            .with_monotone_filter(true)
            .slopes(&xs, &ys)
            .unwrap();

        assert_eq!(slopes[1], 0.0);
        assert_eq!(slopes[2], 0.0);
    }

    #[test]
    fn test_bessel_jacobian_includes_slope_dependence() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = [1.0, 2.0, 3.5, 4.0, 6.0];
        let stretch = LocalControlStretchBuilder::new("s", SlopeAlgorithm::Bessel)
            .with_detail(CalibrationDetail::CalibrateJacobian)
            .build(&xs, &ys)
            .unwrap();

        // Midpoint of [1, 2]: (y1 + y2) / 2 + (m1 - m2) / 8 with centred slopes
        let jacobian = stretch.jacobian_d_response_d_input(1.5).unwrap();
        let expected = [-0.0625, 0.5625, 0.5625, -0.0625, 0.0];
        assert_eq!(jacobian.len(), expected.len());
        for (actual, expected) in jacobian.iter().zip(expected) {
            assert_relative_eq!(*actual, expected, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_jacobian_matches_response_bumps() {
        let h = 1e-5;
        for algorithm in [SlopeAlgorithm::Bessel, SlopeAlgorithm::Akima] {
            let builder = LocalControlStretchBuilder::new("s", algorithm);
            let stretch = builder
                .clone()
                .with_detail(CalibrationDetail::CalibrateJacobian)
                .build(&XS, &YS)
                .unwrap();

            for x in [0.4, 1.5, 2.3, 3.8, 4.6] {
                let jacobian = stretch.jacobian_d_response_d_input(x).unwrap();
                assert_eq!(jacobian.len(), XS.len());
                for j in 0..YS.len() {
                    let mut up = YS;
                    up[j] += h;
                    let mut down = YS;
                    down[j] -= h;
                    let numeric = (builder.build(&XS, &up).unwrap().response_value(x).unwrap()
                        - builder.build(&XS, &down).unwrap().response_value(x).unwrap())
                        / (2.0 * h);
                    assert_relative_eq!(jacobian[j], numeric, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_slope_sensitivity_shape() {
        let sensitivity = LocalControlStretchBuilder::new("s", SlopeAlgorithm::Bessel)
            .slope_sensitivity(&XS, &YS)
            .unwrap();

        assert_eq!(sensitivity.shape(), (XS.len(), XS.len()));
        // Interior Bessel slopes on a uniform grid are centred differences
        assert_relative_eq!(sensitivity[(2, 1)], -0.5, epsilon = 1e-8);
        assert_relative_eq!(sensitivity[(2, 3)], 0.5, epsilon = 1e-8);
        assert_relative_eq!(sensitivity[(2, 2)], 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_rejects_bad_data() {
        let builder = LocalControlStretchBuilder::new("s", SlopeAlgorithm::Kruger);

        assert!(builder.build(&[0.0, 1.0], &[1.0]).is_err());
        assert!(matches!(
            builder.build(&[0.0, 2.0, 1.0], &[1.0, 2.0, 3.0]),
            Err(SplineError::NonMonotonicInput { index: 2, .. })
        ));
        assert!(builder.build(&[0.0, 1.0], &[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_public_filters_check_lengths() {
        let mut slopes = vec![1.0, 1.0];
        assert!(apply_monotone_filter(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], &mut slopes).is_err());
        assert!(eliminate_spurious_extrema(&[0.0, 1.0], &[0.0, 1.0], &mut slopes).is_ok());
    }

    #[test]
    fn test_algorithm_serde_names() {
        let json = serde_json::to_string(&SlopeAlgorithm::VanLeer).unwrap();
        assert_eq!(json, "\"van_leer\"");
    }
}
