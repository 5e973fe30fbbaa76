//! Error types for spline construction, calibration and evaluation.

use knotwork_math::MathError;
use thiserror::Error;

/// A specialized Result type for spline operations.
pub type SplineResult<T> = Result<T, SplineError>;

/// Errors raised by segments, stretches and spans.
#[derive(Error, Debug, Clone)]
pub enum SplineError {
    /// Construction arguments were empty, non-finite or inconsistent.
    #[error("Invalid construction input: {reason}")]
    InvalidConstructionInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// Constraint count does not match the basis dimension.
    #[error("Under/over-determined system: {constraints} constraints for basis dimension {dimension}")]
    UnderOrOverDeterminedSystem {
        /// Number of constraint rows supplied.
        constraints: usize,
        /// Number of basis functions.
        dimension: usize,
    },

    /// The calibration linear system could not be solved.
    #[error("Singular calibration system: {reason}")]
    SingularCalibrationSystem {
        /// Description of the failure.
        reason: String,
    },

    /// Evaluation outside the covered ordinate range.
    #[error("Ordinate {ordinate:.6} outside [{left:.6}, {right:.6}]")]
    DomainViolation {
        /// The requested ordinate.
        ordinate: f64,
        /// Left edge of the covered range.
        left: f64,
        /// Right edge of the covered range.
        right: f64,
    },

    /// Predictor ordinates are not strictly increasing.
    #[error("Non-monotonic input at index {index}: {previous:.6} >= {current:.6}")]
    NonMonotonicInput {
        /// Index of the offending ordinate.
        index: usize,
        /// Preceding ordinate.
        previous: f64,
        /// Offending ordinate.
        current: f64,
    },

    /// Boundary condition needs a derivative the basis does not have.
    #[error("Boundary condition {boundary} incompatible with basis {basis}")]
    IncompatibleBoundary {
        /// The requested boundary condition.
        boundary: String,
        /// The basis that cannot honour it.
        basis: String,
    },

    /// The stretch has not been calibrated.
    #[error("Stretch '{name}' is not calibrated")]
    Uncalibrated {
        /// Name of the stretch.
        name: String,
    },

    /// One segment of a stretch failed to calibrate.
    #[error("Segment {index} failed to calibrate: {source}")]
    SegmentCalibrationFailed {
        /// Index of the failing segment.
        index: usize,
        /// Underlying failure.
        #[source]
        source: Box<SplineError>,
    },
}

impl SplineError {
    /// Creates an invalid construction input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidConstructionInput {
            reason: reason.into(),
        }
    }

    /// Creates a singular calibration system error.
    #[must_use]
    pub fn singular(reason: impl Into<String>) -> Self {
        Self::SingularCalibrationSystem {
            reason: reason.into(),
        }
    }

    /// Creates a domain violation error.
    #[must_use]
    pub fn domain(ordinate: f64, left: f64, right: f64) -> Self {
        Self::DomainViolation {
            ordinate,
            left,
            right,
        }
    }

    /// Wraps a failure with the index of the segment that produced it.
    #[must_use]
    pub fn at_segment(index: usize, source: SplineError) -> Self {
        Self::SegmentCalibrationFailed {
            index,
            source: Box::new(source),
        }
    }

    /// Returns the failing segment index, if this is a segment failure.
    #[must_use]
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            Self::SegmentCalibrationFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<MathError> for SplineError {
    fn from(err: MathError) -> Self {
        Self::SingularCalibrationSystem {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SplineError::UnderOrOverDeterminedSystem {
            constraints: 3,
            dimension: 4,
        };
        assert!(err.to_string().contains("3 constraints"));

        let err = SplineError::domain(11.0, 1.0, 10.0);
        assert!(err.to_string().contains("11.000000"));
    }

    #[test]
    fn test_segment_failure_carries_index() {
        let err = SplineError::at_segment(2, SplineError::singular("zero pivot"));
        assert_eq!(err.segment_index(), Some(2));
        assert!(err.to_string().contains("zero pivot"));
    }

    #[test]
    fn test_math_error_conversion() {
        let err: SplineError = MathError::singular(1).into();
        assert!(matches!(err, SplineError::SingularCalibrationSystem { .. }));
    }
}
