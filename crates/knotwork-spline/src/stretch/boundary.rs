//! Boundary conditions and best-fit targets for global stretch setup.

use crate::error::{SplineError, SplineResult};
use crate::segment::{Segment, SegmentBestFitResponse};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conditions closing the global system at the two ends of a stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundarySettings {
    /// No boundary rows.
    #[default]
    Floating,
    /// `R'' = 0` at both ends.
    Natural,
    /// `R'' = 0` at the left end, `R' = 0` at the right end.
    Financial,
    /// Third-derivative continuity at the second and penultimate knots.
    NotAKnot,
}

impl BoundarySettings {
    /// Highest derivative order the condition refers to.
    #[must_use]
    pub fn required_derivative(self) -> Option<usize> {
        match self {
            Self::Floating => None,
            Self::Natural | Self::Financial => Some(2),
            Self::NotAKnot => Some(3),
        }
    }

    /// Checks the condition against the stretch's segments.
    pub(crate) fn check(self, segments: &[Segment]) -> SplineResult<()> {
        let Some(order) = self.required_derivative() else {
            return Ok(());
        };
        if self == Self::NotAKnot && segments.len() < 3 {
            return Err(SplineError::invalid_input(format!(
                "Not-a-knot boundary needs at least 3 segments, got {}",
                segments.len()
            )));
        }
        let involved: Vec<&Segment> = match self {
            Self::NotAKnot => vec![
                &segments[0],
                &segments[1],
                &segments[segments.len() - 2],
                &segments[segments.len() - 1],
            ],
            _ => vec![&segments[0], &segments[segments.len() - 1]],
        };
        if let Some(segment) = involved
            .into_iter()
            .find(|s| !s.basis().supports_derivative(order))
        {
            return Err(SplineError::IncompatibleBoundary {
                boundary: self.to_string(),
                basis: segment.basis().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for BoundarySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Floating => "floating",
            Self::Natural => "natural",
            Self::Financial => "financial",
            Self::NotAKnot => "not-a-knot",
        };
        f.write_str(label)
    }
}

/// Weighted response targets over a whole stretch.
///
/// Each point is assigned to the segment `[left, right)` containing it; the
/// last segment also takes points on its right edge.
#[derive(Debug, Clone, PartialEq)]
pub struct StretchBestFitResponse {
    inner: SegmentBestFitResponse,
}

impl StretchBestFitResponse {
    /// Creates a best-fit target set; `weights` defaults to all ones.
    pub fn new(ordinates: Vec<f64>, responses: Vec<f64>, weights: Option<Vec<f64>>) -> SplineResult<Self> {
        Ok(Self {
            inner: SegmentBestFitResponse::new(ordinates, responses, weights)?,
        })
    }

    /// Iterates `(ordinate, response, weight)` triples.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.inner.points()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Always false: construction rejects empty sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn for_segment(&self, index: usize, segments: &[Segment]) -> Option<SegmentBestFitResponse> {
        let segment = &segments[index];
        self.inner
            .restricted(segment.left(), segment.right(), index + 1 == segments.len())
    }

    pub(crate) fn check_domain(&self, left: f64, right: f64) -> SplineResult<()> {
        match self.points().find(|(x, _, _)| *x < left || *x > right) {
            Some((x, _, _)) => Err(SplineError::domain(x, left, right)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisSetParams;
    use crate::segment::{SegmentCustomBuilderControl, SegmentInelasticDesignControl};

    fn segments(params: BasisSetParams, count: usize) -> Vec<Segment> {
        let control = SegmentCustomBuilderControl::new(
            params,
            SegmentInelasticDesignControl::unpenalized(1),
            None,
        )
        .unwrap();
        (0..count)
            .map(|i| Segment::new(i as f64, i as f64 + 1.0, &control).unwrap())
            .collect()
    }

    #[test]
    fn test_natural_on_linear_basis_rejected() {
        let err = BoundarySettings::Natural
            .check(&segments(BasisSetParams::LinearHatPair, 2))
            .unwrap_err();
        assert!(matches!(err, SplineError::IncompatibleBoundary { .. }));
    }

    #[test]
    fn test_not_a_knot_segment_count() {
        let cubic = BasisSetParams::cubic();
        assert!(BoundarySettings::NotAKnot.check(&segments(cubic, 2)).is_err());
        assert!(BoundarySettings::NotAKnot.check(&segments(cubic, 3)).is_ok());
        assert!(BoundarySettings::NotAKnot
            .check(&segments(BasisSetParams::Polynomial { degree: 2 }, 3))
            .is_err());
    }

    #[test]
    fn test_best_fit_assignment() {
        let segs = segments(BasisSetParams::cubic(), 2);
        let fit = StretchBestFitResponse::new(vec![0.0, 1.0, 2.0], vec![0.0; 3], None).unwrap();

        assert_eq!(fit.for_segment(0, &segs).unwrap().len(), 1);
        assert_eq!(fit.for_segment(1, &segs).unwrap().len(), 2);
        assert!(fit.check_domain(0.0, 2.0).is_ok());
        assert!(fit.check_domain(0.5, 2.0).is_err());
    }
}
