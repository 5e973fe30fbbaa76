//! Collections of possibly overlapping stretches.

use crate::error::{SplineError, SplineResult};
use crate::stretch::Stretch;
use serde::{Deserialize, Serialize};

/// How a span picks a stretch when several contain an ordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpanResolution {
    /// The earliest added stretch wins.
    #[default]
    FirstInserted,
    /// The narrowest stretch wins, ties go to the earliest added.
    Innermost,
}

/// A set of calibrated stretches evaluated as one curve.
#[derive(Debug, Clone, Default)]
pub struct Span {
    stretches: Vec<Stretch>,
    resolution: SpanResolution,
}

impl Span {
    /// Creates an empty span.
    #[must_use]
    pub fn new(resolution: SpanResolution) -> Self {
        Self {
            stretches: Vec::new(),
            resolution,
        }
    }

    /// Adds a calibrated stretch.
    pub fn add_stretch(&mut self, stretch: Stretch) -> SplineResult<()> {
        if !stretch.is_calibrated() {
            return Err(SplineError::Uncalibrated {
                name: stretch.name().to_string(),
            });
        }
        self.stretches.push(stretch);
        Ok(())
    }

    /// Stretches in insertion order.
    #[must_use]
    pub fn stretches(&self) -> &[Stretch] {
        &self.stretches
    }

    /// Looks a stretch up by name.
    #[must_use]
    pub fn stretch(&self, name: &str) -> Option<&Stretch> {
        self.stretches.iter().find(|s| s.name() == name)
    }

    /// Resolution rule.
    #[must_use]
    pub fn resolution(&self) -> SpanResolution {
        self.resolution
    }

    /// Number of stretches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stretches.len()
    }

    /// Returns true if no stretch has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stretches.is_empty()
    }

    /// Union bounds of all stretches, `None` when empty.
    #[must_use]
    pub fn domain(&self) -> Option<(f64, f64)> {
        self.stretches.iter().fold(None, |acc, s| {
            let (l, r) = s.domain();
            Some(match acc {
                None => (l, r),
                Some((al, ar)) => (al.min(l), ar.max(r)),
            })
        })
    }

    /// The stretch answering queries at `x`.
    pub fn containing_stretch(&self, x: f64) -> SplineResult<&Stretch> {
        let mut candidates = self.stretches.iter().filter(|s| s.contains(x));
        let chosen = match self.resolution {
            SpanResolution::FirstInserted => candidates.next(),
            SpanResolution::Innermost => candidates.fold(None::<&Stretch>, |best, s| match best {
                Some(b) if width(b) <= width(s) => Some(b),
                _ => Some(s),
            }),
        };
        chosen.ok_or_else(|| {
            let (left, right) = self.domain().unwrap_or((f64::NAN, f64::NAN));
            SplineError::domain(x, left, right)
        })
    }

    /// Response at `x`.
    pub fn response_value(&self, x: f64) -> SplineResult<f64> {
        self.containing_stretch(x)?.response_value(x)
    }

    /// `order`-th derivative of the response at `x`.
    pub fn response_value_derivative(&self, x: f64, order: usize) -> SplineResult<f64> {
        self.containing_stretch(x)?.response_value_derivative(x, order)
    }
}

fn width(stretch: &Stretch) -> f64 {
    let (left, right) = stretch.domain();
    right - left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{PredictorResponseDerivative, SegmentCustomBuilderControl};
    use crate::stretch::CalibrationDetail;

    fn flat(name: &str, left: f64, right: f64, level: f64) -> Stretch {
        let mut stretch = Stretch::with_uniform_control(
            name,
            &[left, right],
            &SegmentCustomBuilderControl::cubic(1),
            CalibrationDetail::Calibrate,
        )
        .unwrap();
        let state = PredictorResponseDerivative::new(level, vec![0.0]);
        stretch
            .setup_hermite(&[state.clone()], &[state], None, None)
            .unwrap();
        stretch
    }

    #[test]
    fn test_first_inserted_resolution() {
        let mut span = Span::new(SpanResolution::FirstInserted);
        span.add_stretch(flat("outer", 0.0, 10.0, 1.0)).unwrap();
        span.add_stretch(flat("inner", 2.0, 3.0, 2.0)).unwrap();

        assert!((span.response_value(2.5).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(span.domain(), Some((0.0, 10.0)));
        assert!(span.stretch("inner").is_some());
    }

    #[test]
    fn test_innermost_resolution() {
        let mut span = Span::new(SpanResolution::Innermost);
        span.add_stretch(flat("outer", 0.0, 10.0, 1.0)).unwrap();
        span.add_stretch(flat("inner", 2.0, 3.0, 2.0)).unwrap();

        assert!((span.response_value(2.5).unwrap() - 2.0).abs() < 1e-12);
        assert!((span.response_value(5.0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_uncalibrated_and_uncovered() {
        let mut span = Span::new(SpanResolution::FirstInserted);
        let raw = Stretch::with_uniform_control(
            "raw",
            &[0.0, 1.0],
            &SegmentCustomBuilderControl::cubic(1),
            CalibrationDetail::Calibrate,
        )
        .unwrap();

        assert!(matches!(span.add_stretch(raw), Err(SplineError::Uncalibrated { .. })));
        assert!(span.is_empty());

        span.add_stretch(flat("a", 0.0, 1.0, 1.0)).unwrap();
        assert!(matches!(
            span.response_value(1.5),
            Err(SplineError::DomainViolation { .. })
        ));
    }
}
