//! Interest rate future.

use super::{check_name, check_period, unsupported, CalibratableInstrument};
use crate::context::PricingCurves;
use crate::error::{CurveError, CurveResult};
use crate::measure::ManifestMeasure;

/// A rate future on `[start, end]`.
///
/// The futures rate is the simple forward of the projection curve plus a
/// convexity adjustment; `Price = 100 · (1 - rate)`.
#[derive(Debug, Clone)]
pub struct RateFuture {
    name: String,
    start: f64,
    end: f64,
    index: Option<String>,
    convexity_adjustment: f64,
}

impl RateFuture {
    /// Creates a future projected off the funding curve.
    pub fn new(name: impl Into<String>, start: f64, end: f64) -> CurveResult<Self> {
        let name = name.into();
        check_name(&name)?;
        check_period(&name, start, end)?;
        Ok(Self {
            name,
            start,
            end,
            index: None,
            convexity_adjustment: 0.0,
        })
    }

    /// Projects off the forward curve of `index`.
    pub fn with_index(mut self, index: impl Into<String>) -> CurveResult<Self> {
        let index = index.into();
        if index.trim().is_empty() {
            return Err(CurveError::invalid_input("Forward index must not be empty"));
        }
        self.index = Some(index);
        Ok(self)
    }

    /// Adds a convexity adjustment to the forward rate.
    pub fn with_convexity_adjustment(mut self, adjustment: f64) -> CurveResult<Self> {
        if !adjustment.is_finite() {
            return Err(CurveError::invalid_input("Convexity adjustment must be finite"));
        }
        self.convexity_adjustment = adjustment;
        Ok(self)
    }

    fn rate(&self, curves: &PricingCurves<'_>) -> CurveResult<f64> {
        let projection = curves.projection(self.index.as_deref())?;
        Ok(projection.forward_rate(self.start, self.end)? + self.convexity_adjustment)
    }
}

impl CalibratableInstrument for RateFuture {
    fn name(&self) -> &str {
        &self.name
    }

    fn maturity(&self) -> f64 {
        self.end
    }

    fn supported_measures(&self) -> &'static [ManifestMeasure] {
        &[ManifestMeasure::Rate, ManifestMeasure::Price]
    }

    fn measure_value(&self, measure: ManifestMeasure, curves: &PricingCurves<'_>) -> CurveResult<f64> {
        match measure {
            ManifestMeasure::Rate => self.rate(curves),
            ManifestMeasure::Price => Ok(100.0 * (1.0 - self.rate(curves)?)),
            other => Err(unsupported(&self.name, other)),
        }
    }
}
