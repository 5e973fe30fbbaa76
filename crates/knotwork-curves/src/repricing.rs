//! Repricing validation of calibrated curves.
//!
//! Every calibration instrument is priced off the finished curve and
//! compared to its quote. A curve that does not reproduce its quotes within
//! tolerance is wrong; the report says which instruments and by how much.

use crate::context::{MarketParams, PricingCurves};
use crate::curve::CalibratedCurve;
use crate::error::CurveResult;
use crate::measure::ManifestMeasure;
use crate::representation::StretchRepresentationSpec;
use std::fmt;
use tracing::warn;

/// Repricing of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct RepricingCheck {
    /// Stretch the instrument calibrated.
    pub stretch: String,
    /// Instrument name.
    pub instrument: String,
    /// Quoted measure.
    pub measure: ManifestMeasure,
    /// The quote.
    pub quote: f64,
    /// Measure priced off the curve.
    pub model: f64,
    /// `|model - quote|`.
    pub error: f64,
    /// Tolerance applied.
    pub tolerance: f64,
    /// Whether the error is within tolerance.
    pub passed: bool,
}

impl RepricingCheck {
    /// Creates a check from a quote and a model value.
    #[must_use]
    pub fn new(
        stretch: impl Into<String>,
        instrument: impl Into<String>,
        measure: ManifestMeasure,
        quote: f64,
        model: f64,
        tolerance: f64,
    ) -> Self {
        let error = (model - quote).abs();
        Self {
            stretch: stretch.into(),
            instrument: instrument.into(),
            measure,
            quote,
            model,
            error,
            tolerance,
            passed: error <= tolerance,
        }
    }
}

impl fmt::Display for RepricingCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "ok" } else { "FAIL" };
        write!(
            f,
            "[{status}] {}/{} {} | quote: {:.8} | model: {:.8} | error: {:.2e} (tol: {:.2e})",
            self.stretch,
            self.instrument,
            self.measure,
            self.quote,
            self.model,
            self.error,
            self.tolerance
        )
    }
}

/// Repricing checks of every calibration instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct RepricingReport {
    checks: Vec<RepricingCheck>,
    max_error: f64,
    rms_error: f64,
}

impl RepricingReport {
    /// Aggregates individual checks.
    #[must_use]
    pub fn new(checks: Vec<RepricingCheck>) -> Self {
        let max_error = checks.iter().map(|c| c.error).fold(0.0_f64, f64::max);
        let rms_error = if checks.is_empty() {
            0.0
        } else {
            let sum_sq: f64 = checks.iter().map(|c| c.error * c.error).sum();
            (sum_sq / checks.len() as f64).sqrt()
        };
        Self {
            checks,
            max_error,
            rms_error,
        }
    }

    /// Prices every instrument of `specs` off `curve`.
    pub fn build(
        curve: &CalibratedCurve,
        specs: &[StretchRepresentationSpec],
        market: &MarketParams,
        tolerance: f64,
    ) -> CurveResult<Self> {
        let curves = PricingCurves::new(curve, market);
        let mut checks = Vec::new();
        for spec in specs {
            for ((instrument, measure), quote) in spec
                .instruments()
                .iter()
                .zip(spec.measures())
                .zip(spec.quotes())
            {
                let model = instrument.measure_value(*measure, &curves)?;
                let check = RepricingCheck::new(
                    spec.name(),
                    instrument.name(),
                    *measure,
                    *quote,
                    model,
                    tolerance,
                );
                if !check.passed {
                    warn!(
                        stretch = spec.name(),
                        instrument = instrument.name(),
                        error = check.error,
                        tolerance,
                        "instrument does not reprice within tolerance"
                    );
                }
                checks.push(check);
            }
        }
        Ok(Self::new(checks))
    }

    /// Returns true if every check passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Individual checks.
    #[must_use]
    pub fn checks(&self) -> &[RepricingCheck] {
        &self.checks
    }

    /// Largest absolute error.
    #[must_use]
    pub fn max_error(&self) -> f64 {
        self.max_error
    }

    /// Root mean square error.
    #[must_use]
    pub fn rms_error(&self) -> f64 {
        self.rms_error
    }

    /// Checks that failed.
    #[must_use]
    pub fn failed_checks(&self) -> Vec<&RepricingCheck> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }
}

impl fmt::Display for RepricingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        writeln!(f, "Repricing Report")?;
        writeln!(f, "Status: {}", if self.is_valid() { "PASSED" } else { "FAILED" })?;
        writeln!(f, "Instruments: {passed}/{} passed", self.checks.len())?;
        writeln!(f, "Max Error: {:.2e}", self.max_error)?;
        writeln!(f, "RMS Error: {:.2e}", self.rms_error)?;
        for check in &self.checks {
            writeln!(f, "  {check}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check(error: f64) -> RepricingCheck {
        RepricingCheck::new("s", "i", ManifestMeasure::Rate, 0.03, 0.03 + error, 1e-8)
    }

    #[test]
    fn test_report_statistics() {
        let report = RepricingReport::new(vec![check(3e-9), check(-4e-9)]);

        assert!(report.is_valid());
        assert_relative_eq!(report.max_error(), 4e-9, epsilon = 1e-16);
        assert_relative_eq!(report.rms_error(), (12.5e-18f64).sqrt(), epsilon = 1e-16);
    }

    #[test]
    fn test_report_failure() {
        let report = RepricingReport::new(vec![check(1e-12), check(1e-6)]);

        assert!(!report.is_valid());
        assert_eq!(report.failed_checks().len(), 1);
        assert!(report.to_string().contains("FAIL"));
    }

    #[test]
    fn test_empty_report_is_valid() {
        let report = RepricingReport::new(Vec::new());
        assert!(report.is_valid());
        assert_eq!(report.max_error(), 0.0);
    }
}
