//! Error types for curve calibration.

use knotwork_math::MathError;
use knotwork_spline::SplineError;
use thiserror::Error;

/// A specialized Result type for curve operations.
pub type CurveResult<T> = Result<T, CurveError>;

/// Errors raised while building specs, calibrating and evaluating curves.
#[derive(Error, Debug, Clone)]
pub enum CurveError {
    /// Construction arguments were empty, non-finite or inconsistent.
    #[error("Invalid construction input: {reason}")]
    InvalidConstructionInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// Instrument maturities are not strictly increasing.
    #[error("Non-monotonic maturity at instrument {index}: {previous:.6} >= {current:.6}")]
    NonMonotonicInput {
        /// Position in the concatenated instrument list.
        index: usize,
        /// Preceding maturity (or the valuation ordinate).
        previous: f64,
        /// Offending maturity.
        current: f64,
    },

    /// A quote is missing or not finite.
    #[error("Missing quote for instrument {index} of stretch '{stretch}'")]
    MissingQuote {
        /// Stretch name.
        stretch: String,
        /// Instrument index within the stretch.
        index: usize,
    },

    /// The one-dimensional repricing solve failed.
    #[error("Calibration of instrument {index} in stretch '{stretch}' failed: {reason}")]
    InstrumentCalibrationFailed {
        /// Stretch name.
        stretch: String,
        /// Instrument index within the stretch.
        index: usize,
        /// Description of the failure.
        reason: String,
    },

    /// The instrument cannot produce the requested manifest measure.
    #[error("Instrument '{instrument}' does not support measure {measure}")]
    UnsupportedMeasure {
        /// Instrument name.
        instrument: String,
        /// Requested measure.
        measure: String,
    },

    /// No curve is available for a latent state.
    #[error("No curve for latent state {state}")]
    CurveNotFound {
        /// The latent state that was requested.
        state: String,
    },

    /// Quantification metric does not fit the latent state or the spec set.
    #[error("Incompatible metric: expected {expected}, got {got}")]
    IncompatibleMetric {
        /// What was expected.
        expected: String,
        /// What was supplied.
        got: String,
    },

    /// Spline construction, calibration or evaluation failed.
    #[error(transparent)]
    Spline(#[from] SplineError),

    /// A numerical routine failed.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Configuration could not be parsed or failed validation.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of the problem.
        reason: String,
    },
}

impl CurveError {
    /// Creates an invalid construction input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidConstructionInput {
            reason: reason.into(),
        }
    }

    /// Creates an unsupported measure error.
    #[must_use]
    pub fn unsupported(instrument: impl Into<String>, measure: impl ToString) -> Self {
        Self::UnsupportedMeasure {
            instrument: instrument.into(),
            measure: measure.to_string(),
        }
    }

    /// Creates a curve-not-found error.
    #[must_use]
    pub fn curve_not_found(state: impl ToString) -> Self {
        Self::CurveNotFound {
            state: state.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates an instrument calibration failure.
    #[must_use]
    pub fn instrument_failed(stretch: impl Into<String>, index: usize, reason: impl ToString) -> Self {
        Self::InstrumentCalibrationFailed {
            stretch: stretch.into(),
            index,
            reason: reason.to_string(),
        }
    }
}
