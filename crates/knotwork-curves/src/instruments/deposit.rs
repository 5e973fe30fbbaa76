//! Money market deposit.

use super::{check_name, check_period, unsupported, CalibratableInstrument};
use crate::context::PricingCurves;
use crate::error::CurveResult;
use crate::measure::ManifestMeasure;

/// A deposit from `start` to `end` on the funding curve.
///
/// ```text
/// Rate = (P(start) / P(end) - 1) / τ
/// ```
#[derive(Debug, Clone)]
pub struct Deposit {
    name: String,
    start: f64,
    end: f64,
}

impl Deposit {
    /// Creates a deposit.
    pub fn new(name: impl Into<String>, start: f64, end: f64) -> CurveResult<Self> {
        let name = name.into();
        check_name(&name)?;
        check_period(&name, start, end)?;
        Ok(Self { name, start, end })
    }

    /// Accrual start.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }
}

impl CalibratableInstrument for Deposit {
    fn name(&self) -> &str {
        &self.name
    }

    fn maturity(&self) -> f64 {
        self.end
    }

    fn supported_measures(&self) -> &'static [ManifestMeasure] {
        &[ManifestMeasure::Rate, ManifestMeasure::DiscountFactor]
    }

    fn measure_value(&self, measure: ManifestMeasure, curves: &PricingCurves<'_>) -> CurveResult<f64> {
        let funding = curves.funding()?;
        match measure {
            ManifestMeasure::Rate => funding.forward_rate(self.start, self.end),
            ManifestMeasure::DiscountFactor => {
                Ok(funding.factor(self.end)? / funding.factor(self.start)?)
            }
            other => Err(unsupported(&self.name, other)),
        }
    }
}
